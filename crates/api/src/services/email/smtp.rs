//! SMTP transport.

use async_trait::async_trait;
use domain::models::{MailProvider, TransportError, TransportReceipt};
use domain::services::MailTransport;
use lettre::{
    message::header::ContentType,
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::time::Duration;
use tracing::info;

use super::EmailError;

/// Settings for [`SmtpTransport`].
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
    pub require_auth: bool,
    pub from: String,
    pub timeout_secs: u64,
}

pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    /// Set when authentication is required but not configured. Sends fail
    /// without opening a connection.
    missing_credentials: bool,
}

impl SmtpTransport {
    pub fn new(settings: SmtpSettings) -> Result<Self, EmailError> {
        let host = settings.host.as_str();
        let mut builder = if settings.use_tls {
            let tls_params = TlsParameters::new(host.to_string()).map_err(|e| {
                EmailError::InvalidConfig(format!("TLS configuration error: {}", e))
            })?;

            // 465 is implicit TLS, everything else upgrades with STARTTLS.
            if settings.port == 465 {
                AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                    .map_err(|e| EmailError::InvalidConfig(format!("SMTP relay error: {}", e)))?
                    .port(settings.port)
                    .tls(Tls::Wrapper(tls_params))
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                    .map_err(|e| EmailError::InvalidConfig(format!("SMTP relay error: {}", e)))?
                    .port(settings.port)
                    .tls(Tls::Required(tls_params))
            }
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(settings.port)
        };

        builder = builder.timeout(Some(Duration::from_secs(settings.timeout_secs)));

        let credentials = match (settings.username, settings.password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                Some(Credentials::new(user, pass))
            }
            _ => None,
        };
        let missing_credentials = settings.require_auth && credentials.is_none();
        if let Some(credentials) = credentials {
            builder = builder.credentials(credentials);
        }

        Ok(Self {
            transport: builder.build(),
            from: settings.from,
            missing_credentials,
        })
    }

    fn build_message(&self, to: &str, subject: &str, html: &str) -> Result<Message, TransportError> {
        Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| TransportError::new(format!("Invalid sender address: {}", e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| TransportError::new(format!("Invalid recipient address: {}", e)))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .map_err(|e| TransportError::new(format!("Invalid message: {}", e)))
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    fn provider(&self) -> MailProvider {
        MailProvider::Smtp
    }

    async fn send(
        &self,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<TransportReceipt, TransportError> {
        if self.missing_credentials {
            return Err(TransportError::new(
                "SMTP credentials not configured (missing credentials)",
            ));
        }

        let message = self.build_message(to, subject, html)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| TransportError::new(format!("SMTP error: {}", e)))?;

        let message_id = response.message().next().map(|line| line.to_string());
        info!(to = %to, code = %response.code(), "Email sent via SMTP");

        Ok(TransportReceipt {
            message_id,
            actual_recipient: Some(to.to_string()),
        })
    }
}
