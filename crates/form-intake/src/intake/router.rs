use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Form, Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::domain::{FormFields, SubmissionForm, SubmissionKind, UploadedFile};
use super::notifier::MailTransport;
use super::service::{IntakeError, IntakeService};
use super::store::RecordStore;

/// Router builder exposing the three public form endpoints.
pub fn intake_router<S, T>(service: Arc<IntakeService<S, T>>) -> Router
where
    S: RecordStore + 'static,
    T: MailTransport + 'static,
{
    Router::new()
        .route("/submit-contact-form", post(contact_handler::<S, T>))
        .route("/submit-job-application", post(job_application_handler::<S, T>))
        .route("/submit-application-enquiry", post(enquiry_handler::<S, T>))
        .with_state(service)
}

/// Body of every intake response.
#[derive(Debug, Clone, Serialize)]
pub struct IntakeResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Form body parsed from either `multipart/form-data` or urlencoded content.
#[derive(Debug)]
pub struct FormPayload(pub SubmissionForm);

/// Why a body could not be read as a form.
#[derive(Debug)]
pub struct PayloadRejection(pub String);

// Required by `FromRequest`. Intake handlers take `Result<FormPayload, _>` and answer
// with the kind's validation message instead, so this only renders for other extractors.
impl IntoResponse for PayloadRejection {
    fn into_response(self) -> Response {
        let payload = json!({
            "success": false,
            "message": self.0,
        });
        (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
    }
}

#[async_trait]
impl<S> FromRequest<S> for FormPayload
where
    S: Send + Sync,
{
    type Rejection = PayloadRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|err| PayloadRejection(err.body_text()))?;
            read_multipart(multipart).await.map(FormPayload)
        } else {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|err| PayloadRejection(err.body_text()))?;
            Ok(FormPayload(SubmissionForm::new(pairs.into_iter().collect())))
        }
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<SubmissionForm, PayloadRejection> {
    let mut form = SubmissionForm::new(FormFields::new());

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| PayloadRejection(format!("failed to parse multipart data: {err}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content = field.bytes().await.map_err(|err| {
                    PayloadRejection(format!("failed to read file field '{name}': {err}"))
                })?;
                form = form.with_file(name, UploadedFile::new(file_name, content.to_vec()));
            }
            None => {
                let value = field.text().await.map_err(|err| {
                    PayloadRejection(format!("failed to read field '{name}': {err}"))
                })?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

pub(crate) async fn contact_handler<S, T>(
    State(service): State<Arc<IntakeService<S, T>>>,
    payload: Result<FormPayload, PayloadRejection>,
) -> Response
where
    S: RecordStore + 'static,
    T: MailTransport + 'static,
{
    submit(&service, SubmissionKind::Contact, payload).await
}

pub(crate) async fn job_application_handler<S, T>(
    State(service): State<Arc<IntakeService<S, T>>>,
    payload: Result<FormPayload, PayloadRejection>,
) -> Response
where
    S: RecordStore + 'static,
    T: MailTransport + 'static,
{
    submit(&service, SubmissionKind::JobApplication, payload).await
}

pub(crate) async fn enquiry_handler<S, T>(
    State(service): State<Arc<IntakeService<S, T>>>,
    payload: Result<FormPayload, PayloadRejection>,
) -> Response
where
    S: RecordStore + 'static,
    T: MailTransport + 'static,
{
    submit(&service, SubmissionKind::Enquiry, payload).await
}

async fn submit<S, T>(
    service: &IntakeService<S, T>,
    kind: SubmissionKind,
    payload: Result<FormPayload, PayloadRejection>,
) -> Response
where
    S: RecordStore + 'static,
    T: MailTransport + 'static,
{
    let form = match payload {
        Ok(FormPayload(form)) => form,
        Err(PayloadRejection(reason)) => {
            debug!(%kind, %reason, "rejecting malformed body");
            return respond(StatusCode::BAD_REQUEST, false, kind.validation_message());
        }
    };

    match service.handle(kind, form).await {
        Ok(receipt) => respond(StatusCode::OK, true, receipt.message()),
        Err(err @ IntakeError::Validation { .. }) => {
            respond(StatusCode::BAD_REQUEST, false, err.client_message())
        }
        Err(err @ IntakeError::Persistence { .. }) => {
            respond(StatusCode::INTERNAL_SERVER_ERROR, false, err.client_message())
        }
    }
}

fn respond(status: StatusCode, success: bool, message: &'static str) -> Response {
    (status, axum::Json(IntakeResponse { success, message })).into_response()
}
