mod cli;
mod infra;
mod routes;
mod server;

use form_intake::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
