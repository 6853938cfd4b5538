pub mod config;
pub mod error;
pub mod pipeline;
pub mod telemetry;

pub use config::AppConfig;
pub use error::AppError;
