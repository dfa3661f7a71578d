//! Mailer that only logs, for development without a mail provider.

use async_trait::async_trait;
use tracing::info;

use crate::domain::ports::{InvitationMail, Mailer, MailerError};

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMailer;

#[async_trait]
impl Mailer for LoggingMailer {
    async fn send_invitation(&self, mail: &InvitationMail) -> Result<(), MailerError> {
        info!(
            recipient = %mail.recipient_email,
            activation_url = %mail.activation_url,
            "invitation mail not sent; no mail API configured"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logging_mailer_always_succeeds() {
        let mail = InvitationMail {
            recipient_email: "ada@example.com".to_owned(),
            recipient_name: "ada".to_owned(),
            activation_url: "http://localhost:3000/confirm/abc".to_owned(),
        };
        assert_eq!(LoggingMailer.send_invitation(&mail).await, Ok(()));
    }
}
