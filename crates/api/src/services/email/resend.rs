//! Resend HTTP API transport.

use async_trait::async_trait;
use domain::models::{MailProvider, TransportError, TransportReceipt};
use domain::services::MailTransport;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::EmailError;

/// Settings for [`ResendTransport`].
#[derive(Debug, Clone)]
pub struct ResendSettings {
    pub api_key: String,
    pub api_base: String,
    /// `Name <address>` or a bare address.
    pub from: String,
    /// When set, every message goes to this inbox.
    pub sandbox_recipient: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct ResendTransport {
    client: reqwest::Client,
    settings: ResendSettings,
}

impl ResendTransport {
    pub fn new(settings: ResendSettings) -> Result<Self, EmailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| EmailError::InvalidConfig(format!("HTTP client error: {}", e)))?;

        Ok(Self { client, settings })
    }

    fn delivery_address<'a>(&'a self, to: &'a str) -> &'a str {
        self.settings.sandbox_recipient.as_deref().unwrap_or(to)
    }

    fn endpoint(&self) -> String {
        format!("{}/emails", self.settings.api_base.trim_end_matches('/'))
    }
}

/// Raw error text from a non-2xx Resend response.
fn provider_error(status: reqwest::StatusCode, body: &str) -> String {
    let parsed: ErrorResponse = serde_json::from_str(body).unwrap_or_default();
    match (parsed.name, parsed.message) {
        (Some(name), Some(message)) => format!("Resend API error ({}): {}: {}", status, name, message),
        (None, Some(message)) => format!("Resend API error ({}): {}", status, message),
        _ => format!("Resend API error ({}): {}", status, body.trim()),
    }
}

#[async_trait]
impl MailTransport for ResendTransport {
    fn provider(&self) -> MailProvider {
        MailProvider::Resend
    }

    async fn send(
        &self,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<TransportReceipt, TransportError> {
        if self.settings.api_key.trim().is_empty() {
            return Err(TransportError::new(
                "Resend API key is missing (set MI__EMAIL__RESEND_API_KEY)",
            ));
        }

        let recipient = self.delivery_address(to);
        if recipient != to {
            debug!(intended = %to, actual = %recipient, "Resend sandbox recipient in effect");
        }

        let body = serde_json::json!({
            "from": self.settings.from,
            "to": [recipient],
            "subject": subject,
            "html": html,
        });

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::new(format!("Resend request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::new(format!("Resend response unreadable: {}", e)))?;

        if !status.is_success() {
            return Err(TransportError::new(provider_error(status, &text)));
        }

        let message_id = serde_json::from_str::<SendResponse>(&text)
            .ok()
            .and_then(|r| r.id);

        info!(to = %recipient, message_id = ?message_id, "Email sent via Resend");

        Ok(TransportReceipt {
            message_id,
            actual_recipient: Some(recipient.to_string()),
        })
    }
}
