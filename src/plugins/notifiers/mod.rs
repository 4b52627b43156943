pub mod email;

pub use email::SmtpMailer;
