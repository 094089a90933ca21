//! End-to-end scenarios for the public form endpoints.
//!
//! Requests go through the router with real CSV stores, a real upload directory and the
//! configured mail transports, so the full validate -> persist -> notify sequence is covered
//! without reaching into private modules.

mod common {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request};
    use axum::response::Response;
    use form_intake::config::{MailConfig, MailTransportConfig, SmtpSecurity};
    use form_intake::intake::{
        intake_router, ConfiguredTransport, CsvRecordStore, FileIntake, IntakeService, Notifier,
    };
    use serde_json::Value;
    use tempfile::TempDir;

    pub(super) const BOUNDARY: &str = "workflow-boundary";

    pub(super) struct Site {
        pub(super) dir: TempDir,
        pub(super) router: axum::Router,
    }

    impl Site {
        pub(super) fn with_outbox() -> Self {
            let dir = tempfile::tempdir().expect("temp dir");
            let transport = MailTransportConfig::File {
                path: dir.path().join("outbox"),
            };
            Self::build(dir, transport)
        }

        /// Mail goes to a closed local port, so every delivery attempt fails.
        pub(super) fn with_unreachable_relay() -> Self {
            let dir = tempfile::tempdir().expect("temp dir");
            let transport = MailTransportConfig::Smtp {
                host: "127.0.0.1".to_string(),
                port: 1,
                security: SmtpSecurity::None,
                username: "forms@example.com".to_string(),
                password: "secret".to_string(),
            };
            Self::build(dir, transport)
        }

        fn build(dir: TempDir, transport: MailTransportConfig) -> Self {
            let mail = MailConfig {
                transport,
                sender: "Website <forms@example.com>".parse().expect("sender"),
                recipient: "office@example.com".parse().expect("recipient"),
                send_timeout: Duration::from_secs(5),
            };
            let notifier: Notifier<ConfiguredTransport> =
                Notifier::from_config(&mail).expect("transport builds");
            let uploads = FileIntake::prepare(dir.path().join("uploads")).expect("upload root");
            let store = CsvRecordStore::new(dir.path().join("data"));

            let service = IntakeService::new(Arc::new(store), uploads, Arc::new(notifier));
            let router = intake_router(Arc::new(service));
            Self { dir, router }
        }

        pub(super) fn path(&self, relative: &str) -> PathBuf {
            self.dir.path().join(relative)
        }

        pub(super) fn outbox_messages(&self) -> Vec<String> {
            let outbox = self.path("outbox");
            if !outbox.exists() {
                return Vec::new();
            }
            std::fs::read_dir(outbox)
                .expect("read outbox")
                .map(|entry| {
                    std::fs::read_to_string(entry.expect("entry").path()).expect("read eml")
                })
                .collect()
        }
    }

    pub(super) fn rows(path: &Path) -> Vec<Vec<String>> {
        if !path.exists() {
            return Vec::new();
        }
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .expect("open store")
            .records()
            .map(|record| record.expect("row").iter().map(str::to_string).collect())
            .collect()
    }

    pub(super) fn form_request(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    pub(super) fn resume_request(file_name: &str, content: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in [
            ("name", "Asha Rao"),
            ("email", "asha@example.com"),
            ("phone", "555-0100"),
            ("position", "Instructor"),
        ] {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::post("/submit-job-application")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    pub(super) async fn json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }
}

use axum::http::StatusCode;
use common::*;
use tower::ServiceExt;

const ENQUIRY: &str =
    "application_type=admission&full_name=Ravi%20Kumar&email=ravi%40example.com&phone=555-0101&course=Data%20Science";

#[tokio::test]
async fn contact_form_is_mailed_and_not_stored() {
    let site = Site::with_outbox();

    let response = site
        .router
        .clone()
        .oneshot(form_request(
            "/submit-contact-form",
            "name=A&email=a%40x.com&subject=S&message=M",
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = json(response).await;
    assert_eq!(payload["success"], true);

    let messages = site.outbox_messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Subject: New Contact Form Submission: S"));
    assert!(!site.path("data").exists());
}

#[tokio::test]
async fn job_applications_share_resume_name_with_overwrite() {
    let site = Site::with_outbox();

    for content in [&b"first resume"[..], &b"second resume"[..]] {
        let response = site
            .router
            .clone()
            .oneshot(resume_request("cv.pdf", content))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let resume = site.path("uploads/cv.pdf");
    assert_eq!(std::fs::read(&resume).expect("resume"), b"second resume");

    let rows = rows(&site.path("data/job_applications.csv"));
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], vec!["Name", "Email", "Phone", "Position", "Resume"]);
    assert!(rows[1..]
        .iter()
        .all(|row| row[4] == resume.display().to_string()));

    let messages = site.outbox_messages();
    assert_eq!(messages.len(), 2);
    assert!(messages
        .iter()
        .all(|raw| raw.contains("cv.pdf") && raw.contains("application/octet-stream")));
}

#[tokio::test]
async fn missing_field_leaves_every_store_untouched() {
    let site = Site::with_outbox();

    for request in [
        resume_request("cv.pdf", b"resume"),
        form_request("/submit-application-enquiry", ENQUIRY),
    ] {
        let response = site
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
    }
    let jobs_before = rows(&site.path("data/job_applications.csv"));
    let enquiries_before = rows(&site.path("data/enquiries.csv"));
    assert_eq!(jobs_before.len(), 2);
    assert_eq!(enquiries_before.len(), 2);

    let response = site
        .router
        .clone()
        .oneshot(form_request(
            "/submit-application-enquiry",
            "application_type=admission&full_name=&email=ravi%40example.com&phone=1&course=ML",
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = json(response).await;
    assert_eq!(payload["message"], "All required fields must be filled.");

    let response = site
        .router
        .clone()
        .oneshot(form_request(
            "/submit-job-application",
            "name=Asha%20Rao&email=asha%40example.com&phone=555-0100&position=Instructor",
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = json(response).await;
    assert_eq!(
        payload["message"],
        "All fields must be filled, including resume."
    );

    assert_eq!(rows(&site.path("data/job_applications.csv")), jobs_before);
    assert_eq!(rows(&site.path("data/enquiries.csv")), enquiries_before);
    assert_eq!(site.outbox_messages().len(), 2);
}

#[tokio::test]
async fn unreachable_relay_still_records_and_succeeds() {
    let site = Site::with_unreachable_relay();

    let response = site
        .router
        .clone()
        .oneshot(form_request("/submit-application-enquiry", ENQUIRY))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = json(response).await;
    assert_eq!(
        payload["message"],
        "✅ Your course enquiry has been submitted successfully!"
    );

    let rows = rows(&site.path("data/enquiries.csv"));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][1], "Ravi Kumar");
    assert_eq!(rows[1][5], "");
}
