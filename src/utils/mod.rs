pub mod error;
pub mod merge;
pub mod time;

pub use error::{AppError, Result};
pub use merge::deep_merge;
pub use time::minutes;
