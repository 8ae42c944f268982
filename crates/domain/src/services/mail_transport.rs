//! Mail transport contract.
//!
//! A transport sends one message and reports what it did. It does not
//! classify its own failures; the delivery pipeline does that from the raw
//! error text.

use crate::models::{MailProvider, TransportError, TransportReceipt};
use async_trait::async_trait;
use tokio::sync::Mutex;

#[async_trait]
pub trait MailTransport: Send + Sync {
    fn provider(&self) -> MailProvider;

    async fn send(
        &self,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<TransportReceipt, TransportError>;
}

/// A message captured by [`MockMailTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone)]
enum MockBehavior {
    Deliver,
    RedirectTo(String),
    Fail(String),
}

/// Scripted transport for development and testing.
#[derive(Debug)]
pub struct MockMailTransport {
    provider: MailProvider,
    behavior: MockBehavior,
    sent: Mutex<Vec<SentMail>>,
}

impl MockMailTransport {
    /// Delivers every message to its intended recipient.
    pub fn delivering() -> Self {
        Self::with_behavior(MockBehavior::Deliver)
    }

    /// Delivers every message to `inbox`, like a provider in sandbox mode.
    pub fn redirecting_to(inbox: impl Into<String>) -> Self {
        Self::with_behavior(MockBehavior::RedirectTo(inbox.into()))
    }

    /// Fails every send with `raw` as the provider error.
    pub fn failing(raw: impl Into<String>) -> Self {
        Self::with_behavior(MockBehavior::Fail(raw.into()))
    }

    fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            provider: MailProvider::Console,
            behavior,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn with_provider(mut self, provider: MailProvider) -> Self {
        self.provider = provider;
        self
    }

    /// Messages handed to this transport, failed attempts included.
    pub async fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl MailTransport for MockMailTransport {
    fn provider(&self) -> MailProvider {
        self.provider
    }

    async fn send(
        &self,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<TransportReceipt, TransportError> {
        self.sent.lock().await.push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });

        match &self.behavior {
            MockBehavior::Deliver => Ok(TransportReceipt {
                message_id: Some(format!("mock-{}", uuid::Uuid::new_v4())),
                actual_recipient: Some(to.to_string()),
            }),
            MockBehavior::RedirectTo(inbox) => {
                tracing::info!(intended = %to, actual = %inbox, "Mock: redirecting message");
                Ok(TransportReceipt {
                    message_id: Some(format!("mock-{}", uuid::Uuid::new_v4())),
                    actual_recipient: Some(inbox.clone()),
                })
            }
            MockBehavior::Fail(raw) => {
                tracing::warn!(to = %to, "Mock mail transport simulating failure");
                Err(TransportError::new(raw.clone()))
            }
        }
    }
}
