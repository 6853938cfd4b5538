mod admin;
mod cli;
mod infra;
mod routes;
mod server;

use recruitment_tracker::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
