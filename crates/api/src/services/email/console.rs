//! Console transport for local development.

use async_trait::async_trait;
use domain::models::{MailProvider, TransportError, TransportReceipt};
use domain::services::MailTransport;
use tracing::info;
use uuid::Uuid;

/// Logs messages instead of sending them. Never fails.
#[derive(Debug, Default)]
pub struct ConsoleTransport;

impl ConsoleTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MailTransport for ConsoleTransport {
    fn provider(&self) -> MailProvider {
        MailProvider::Console
    }

    async fn send(
        &self,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<TransportReceipt, TransportError> {
        let message_id = format!("console-{}", Uuid::new_v4());
        info!(
            to = %to,
            subject = %subject,
            message_id = %message_id,
            html_bytes = html.len(),
            "Email (console provider)"
        );

        Ok(TransportReceipt {
            message_id: Some(message_id),
            actual_recipient: Some(to.to_string()),
        })
    }
}
