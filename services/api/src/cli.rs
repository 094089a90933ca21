use crate::server;
use clap::{Args, Parser, Subcommand};
use form_intake::config::AppConfig;
use form_intake::error::AppError;
use form_intake::intake::Notifier;
use form_intake::telemetry;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "Form Intake Service",
    about = "Receive website form submissions, record them, and relay them by e-mail",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Send one test notification through the configured mail transport
    MailCheck(MailCheckArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct MailCheckArgs {
    /// Subject line for the test message
    #[arg(long, default_value = "Form intake mail check")]
    pub(crate) subject: String,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::MailCheck(args) => mail_check(args).await,
    }
}

async fn mail_check(args: MailCheckArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let notifier = Notifier::from_config(&config.mail)?;
    notifier
        .notify(
            &args.subject,
            "This is a test message from the form intake service.\n",
        )
        .await?;

    info!(recipient = %config.mail.recipient, transport = ?config.mail.transport, "mail check delivered");
    println!("Test notification sent to {}", config.mail.recipient);
    Ok(())
}
