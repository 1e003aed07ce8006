mod cli;
mod infra;
mod report;
mod routes;
mod server;

use docente_metrics::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
