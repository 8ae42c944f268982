//! One delivery attempt through the configured transport, classified.

use domain::models::{classify_transport_error, DeliveryResult, MailProvider};
use domain::services::MailTransport;
use metrics::counter;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct DeliveryPipeline {
    transport: Arc<dyn MailTransport>,
}

impl DeliveryPipeline {
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    pub fn provider(&self) -> MailProvider {
        self.transport.provider()
    }

    /// Sends once and reports what happened. Never touches storage.
    pub async fn send_invitation(&self, email: &str, html: &str, subject: &str) -> DeliveryResult {
        let provider = self.transport.provider();

        let result = match self.transport.send(email, subject, html).await {
            Ok(receipt) => match receipt.actual_recipient {
                Some(actual) if !actual.eq_ignore_ascii_case(email) => {
                    DeliveryResult::TestModeRedirect {
                        provider,
                        message_id: receipt.message_id,
                        intended_recipient: email.to_string(),
                        actual_recipient: actual,
                    }
                }
                _ => DeliveryResult::Delivered {
                    provider,
                    message_id: receipt.message_id,
                },
            },
            Err(e) => DeliveryResult::Failed {
                provider,
                kind: classify_transport_error(&e.raw),
                detail: e.raw,
            },
        };

        match &result {
            DeliveryResult::Failed { kind, detail, .. } => warn!(
                provider = %provider,
                error_kind = %kind,
                detail = %detail,
                "Invitation email delivery failed"
            ),
            DeliveryResult::TestModeRedirect {
                intended_recipient,
                actual_recipient,
                ..
            } => warn!(
                provider = %provider,
                intended = %intended_recipient,
                actual = %actual_recipient,
                "Invitation email redirected by sandbox transport"
            ),
            DeliveryResult::Delivered { message_id, .. } => info!(
                provider = %provider,
                message_id = ?message_id,
                "Invitation email delivered"
            ),
        }

        counter!(
            "invitation_emails_total",
            "provider" => provider.as_str(),
            "outcome" => result.outcome_label()
        )
        .increment(1);

        result
    }
}
