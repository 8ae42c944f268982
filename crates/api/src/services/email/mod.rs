//! Invitation email delivery.
//!
//! Providers:
//! - `console`: logs emails (development)
//! - `resend`: Resend HTTP API
//! - `smtp`: any SMTP relay
//!
//! Exactly one provider is active, chosen at startup.

mod console;
mod pipeline;
mod resend;
mod smtp;
mod templates;

pub use console::ConsoleTransport;
pub use pipeline::DeliveryPipeline;
pub use resend::{ResendSettings, ResendTransport};
pub use smtp::{SmtpSettings, SmtpTransport};
pub use templates::{InvitationEmailContent, InvitationEmailContext, InvitationEmailRenderer};

use crate::config::EmailConfig;
use domain::models::MailProvider;
use domain::services::MailTransport;
use std::sync::Arc;
use thiserror::Error;

/// Transport construction error.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Invalid email configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown email provider: {0}")]
    UnknownProvider(String),
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Formatted sender, e.g. `Mentor Invite <convites@example.com>`.
fn sender(config: &EmailConfig) -> String {
    match non_empty(&config.sender_name) {
        Some(name) => format!("{} <{}>", name, config.sender_email),
        None => config.sender_email.clone(),
    }
}

/// Builds the transport selected by `email.provider`.
pub fn create_transport(config: &EmailConfig) -> Result<Arc<dyn MailTransport>, EmailError> {
    let provider: MailProvider = config
        .provider
        .parse()
        .map_err(|_| EmailError::UnknownProvider(config.provider.clone()))?;

    let transport: Arc<dyn MailTransport> = match provider {
        MailProvider::Console => Arc::new(ConsoleTransport::new()),
        MailProvider::Resend => Arc::new(ResendTransport::new(ResendSettings {
            api_key: config.resend_api_key.clone(),
            api_base: config.resend_api_base.clone(),
            from: sender(config),
            sandbox_recipient: non_empty(&config.sandbox_recipient),
            timeout_secs: config.timeout_secs,
        })?),
        MailProvider::Smtp => Arc::new(SmtpTransport::new(SmtpSettings {
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            username: non_empty(&config.smtp_username),
            password: non_empty(&config.smtp_password),
            use_tls: config.smtp_use_tls,
            require_auth: config.smtp_require_auth,
            from: sender(config),
            timeout_secs: config.timeout_secs,
        })?),
    };

    tracing::info!(provider = %provider, "Email transport configured");
    Ok(transport)
}
