pub mod alerts;
pub mod config;
pub mod evaluator;
pub mod models;
pub mod orchestrator;
pub mod plugins;
pub mod scheduler;
pub mod scraper;
pub mod utils;

// Re-export commonly used types
pub use alerts::{AlertDispatcher, DispatchOutcome};
pub use config::AppConfig;
pub use orchestrator::DealMon;
pub use plugins::{CheckerRegistry, SmtpMailer};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
