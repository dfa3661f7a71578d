//! Reqwest-backed mail adapter for a Mailtrap-style send API.
//!
//! This adapter owns transport details only: request serialisation, timeout
//! and HTTP status mapping.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use tracing::debug;

use crate::domain::ports::{InvitationMail, Mailer, MailerError};

/// Request timeout applied to every send.
pub const MAIL_TIMEOUT: Duration = Duration::from_secs(10);

/// Sender identity and credentials for the mail API.
#[derive(Debug, Clone)]
pub struct HttpMailerConfig {
    pub endpoint: Url,
    pub api_token: String,
    pub from_email: String,
    /// Display name on outgoing mail and in the subject line.
    pub app_name: String,
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: Address<'a>,
    to: [Address<'a>; 1],
    subject: String,
    text: String,
    category: &'static str,
}

/// Mail adapter that POSTs JSON to one endpoint.
pub struct HttpMailer {
    client: Client,
    config: HttpMailerConfig,
}

impl HttpMailer {
    /// Build an adapter with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: HttpMailerConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(MAIL_TIMEOUT).build()?;
        Ok(Self { client, config })
    }
}

fn build_request<'a>(config: &'a HttpMailerConfig, mail: &'a InvitationMail) -> SendRequest<'a> {
    SendRequest {
        from: Address {
            email: &config.from_email,
            name: Some(&config.app_name),
        },
        to: [Address {
            email: &mail.recipient_email,
            name: Some(&mail.recipient_name),
        }],
        subject: format!("Finish signing up for {}", config.app_name),
        text: format!(
            "Hi {name},\n\nThanks for joining {app}. Confirm your account within 24 hours:\n{url}\n",
            name = mail.recipient_name,
            app = config.app_name,
            url = mail.activation_url,
        ),
        category: "user-invitation",
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_invitation(&self, mail: &InvitationMail) -> Result<(), MailerError> {
        let response = self
            .client
            .post(self.config.endpoint.clone())
            .bearer_auth(&self.config.api_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&build_request(&self.config, mail))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        debug!(status = status.as_u16(), "invitation mail accepted");
        Ok(())
    }
}

fn map_transport_error(error: reqwest::Error) -> MailerError {
    if error.is_timeout() {
        MailerError::timeout(error.to_string())
    } else {
        MailerError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> MailerError {
    let preview = body_preview(body);
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            MailerError::timeout(format!("status {}: {preview}", status.as_u16()))
        }
        _ => MailerError::rejected(status.as_u16(), preview),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
