//! Mail delivery adapters.

mod http_mailer;
mod logging_mailer;

pub use http_mailer::{HttpMailer, HttpMailerConfig, MAIL_TIMEOUT};
pub use logging_mailer::LoggingMailer;
