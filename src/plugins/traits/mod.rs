pub mod checker;
pub mod notifier;

pub use checker::{Checker, CheckerBox};
pub use notifier::{AlertMessage, AlertTransport};
