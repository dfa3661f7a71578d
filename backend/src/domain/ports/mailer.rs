//! Port for delivering transactional mail.
use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by mail delivery adapters.
    pub enum MailerError {
        /// The request never reached the provider.
        Transport { message: String } => "mail transport failed: {message}",
        /// The provider did not answer in time.
        Timeout { message: String } => "mail delivery timed out: {message}",
        /// The provider answered with a non-success status.
        Rejected { status: u16, message: String } => "mail provider rejected message ({status}): {message}",
    }
}

/// Account activation mail sent after registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationMail {
    pub recipient_email: String,
    pub recipient_name: String,
    pub activation_url: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_invitation(&self, mail: &InvitationMail) -> Result<(), MailerError>;
}
