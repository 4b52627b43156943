pub mod traits;
pub mod registry;
pub mod checkers;
pub mod notifiers;

pub use notifiers::SmtpMailer;
pub use registry::CheckerRegistry;
pub use traits::{AlertMessage, AlertTransport, Checker, CheckerBox};
