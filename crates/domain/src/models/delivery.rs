//! Email delivery results and failure classification.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Mail transport implementations a deployment can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailProvider {
    Console,
    Resend,
    Smtp,
}

impl MailProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            MailProvider::Console => "console",
            MailProvider::Resend => "resend",
            MailProvider::Smtp => "smtp",
        }
    }
}

impl FromStr for MailProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" => Ok(MailProvider::Console),
            "resend" => Ok(MailProvider::Resend),
            "smtp" => Ok(MailProvider::Smtp),
            _ => Err(format!(
                "Invalid email provider: {}. Expected 'console', 'resend' or 'smtp'",
                s
            )),
        }
    }
}

impl fmt::Display for MailProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a transport reports after accepting a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportReceipt {
    pub message_id: Option<String>,
    /// Inbox the transport actually delivered to, when it tells us.
    pub actual_recipient: Option<String>,
}

/// Raw failure reported by a transport, classified later.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{raw}")]
pub struct TransportError {
    pub raw: String,
}

impl TransportError {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

/// Why an invitation email could not be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryErrorKind {
    MissingCredentials,
    DomainUnverified,
    TransportFailure,
    ValidationError,
    Unknown,
}

impl DeliveryErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryErrorKind::MissingCredentials => "missingCredentials",
            DeliveryErrorKind::DomainUnverified => "domainUnverified",
            DeliveryErrorKind::TransportFailure => "transportFailure",
            DeliveryErrorKind::ValidationError => "validationError",
            DeliveryErrorKind::Unknown => "unknown",
        }
    }

    /// What the mentor (or their administrator) can do about it.
    pub fn remediation_hint(&self) -> &'static str {
        match self {
            DeliveryErrorKind::MissingCredentials => {
                "Email service API key is not configured. Contact the administrator to configure the API key."
            }
            DeliveryErrorKind::DomainUnverified => {
                "The sending domain is not verified. Verify a sending domain with the email provider."
            }
            DeliveryErrorKind::TransportFailure => {
                "Email transport failed. Check the transport credentials and network connectivity."
            }
            DeliveryErrorKind::ValidationError => {
                "The email provider rejected the message. Check the recipient address and message content."
            }
            DeliveryErrorKind::Unknown => {
                "The invitation email could not be sent. Try resending the invitation later."
            }
        }
    }

    /// Whether fixing this needs an administrator rather than a retry.
    pub fn needs_administrator(&self) -> bool {
        matches!(
            self,
            DeliveryErrorKind::MissingCredentials
                | DeliveryErrorKind::DomainUnverified
                | DeliveryErrorKind::TransportFailure
        )
    }
}

impl fmt::Display for DeliveryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

lazy_static! {
    static ref MISSING_CREDENTIALS: Regex = Regex::new(
        r"(?i)api[ _-]?key|ausente|missing credentials|credentials? not configured"
    )
    .unwrap();
    static ref DOMAIN_UNVERIFIED: Regex = Regex::new(
        r"(?i)domain|dom[ií]nio|\bverif|testing emails|own email address"
    )
    .unwrap();
    static ref TRANSPORT_FAILURE: Regex = Regex::new(
        r"(?i)smtp|connection|conex[aã]o|timed? ?out|authentication|autentica[cç][aã]o|econnrefused"
    )
    .unwrap();
    static ref VALIDATION_ERROR: Regex =
        Regex::new(r"(?i)validation|invalid|missing required|\b422\b|unprocessable").unwrap();
}

/// Classifies a raw transport error.
///
/// Rules are checked in a fixed order because one message can match several
/// (an "authentication" failure may also mention the API key). Missing
/// credentials come first since configuration alone fixes them.
pub fn classify_transport_error(raw: &str) -> DeliveryErrorKind {
    if MISSING_CREDENTIALS.is_match(raw) {
        DeliveryErrorKind::MissingCredentials
    } else if DOMAIN_UNVERIFIED.is_match(raw) {
        DeliveryErrorKind::DomainUnverified
    } else if TRANSPORT_FAILURE.is_match(raw) {
        DeliveryErrorKind::TransportFailure
    } else if VALIDATION_ERROR.is_match(raw) {
        DeliveryErrorKind::ValidationError
    } else {
        DeliveryErrorKind::Unknown
    }
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
    Delivered {
        provider: MailProvider,
        message_id: Option<String>,
    },
    /// A sandbox transport rerouted the message to a fixed inbox.
    TestModeRedirect {
        provider: MailProvider,
        message_id: Option<String>,
        intended_recipient: String,
        actual_recipient: String,
    },
    Failed {
        provider: MailProvider,
        kind: DeliveryErrorKind,
        /// Raw transport error, for operators only.
        detail: String,
    },
}

impl DeliveryResult {
    pub fn success(&self) -> bool {
        !matches!(self, DeliveryResult::Failed { .. })
    }

    pub fn provider(&self) -> MailProvider {
        match self {
            DeliveryResult::Delivered { provider, .. }
            | DeliveryResult::TestModeRedirect { provider, .. }
            | DeliveryResult::Failed { provider, .. } => *provider,
        }
    }

    pub fn error_kind(&self) -> Option<DeliveryErrorKind> {
        match self {
            DeliveryResult::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_test_mode_redirect(&self) -> bool {
        matches!(self, DeliveryResult::TestModeRedirect { .. })
    }

    /// Label used for logs and metrics.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            DeliveryResult::Delivered { .. } => "delivered",
            DeliveryResult::TestModeRedirect { .. } => "test_mode_redirect",
            DeliveryResult::Failed { kind, .. } => kind.as_str(),
        }
    }
}
