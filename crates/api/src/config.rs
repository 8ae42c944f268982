use domain::models::{MailProvider, INVITATION_TTL_DAYS, MAX_CODE_GENERATION_ATTEMPTS};
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    /// Bearer token verification
    pub jwt: JwtAuthConfig,
    /// Invitation email transport
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub invitations: InvitationsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Public URL of the web app, used for links in emails.
    #[serde(default = "default_app_base_url")]
    pub app_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn pool_config(&self) -> persistence::db::DatabaseConfig {
        persistence::db::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            idle_timeout_secs: self.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtAuthConfig {
    /// RSA private key in PEM format, for tooling that mints tokens
    pub private_key: String,

    /// RSA public key in PEM format for verifying tokens
    pub public_key: String,

    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: i64,

    /// Clock skew tolerance
    #[serde(default = "default_jwt_leeway")]
    pub leeway_secs: u64,
}

/// Email transport configuration. Exactly one provider is active.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// console, resend or smtp
    #[serde(default = "default_email_provider")]
    pub provider: String,

    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    #[serde(default)]
    pub resend_api_key: String,

    #[serde(default = "default_resend_api_base")]
    pub resend_api_base: String,

    /// Inbox every message is delivered to while the sending domain is
    /// unverified. Leave empty in production.
    #[serde(default)]
    pub sandbox_recipient: String,

    #[serde(default)]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub smtp_username: String,

    #[serde(default)]
    pub smtp_password: String,

    /// Implicit TLS on port 465, STARTTLS elsewhere
    #[serde(default = "default_true")]
    pub smtp_use_tls: bool,

    #[serde(default = "default_true")]
    pub smtp_require_auth: bool,

    #[serde(default = "default_email_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: default_email_provider(),
            sender_email: default_sender_email(),
            sender_name: default_sender_name(),
            resend_api_key: String::new(),
            resend_api_base: default_resend_api_base(),
            sandbox_recipient: String::new(),
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_use_tls: true,
            smtp_require_auth: true,
            timeout_secs: default_email_timeout(),
        }
    }
}

impl EmailConfig {
    pub fn mail_provider(&self) -> Result<MailProvider, String> {
        self.provider.parse()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvitationsConfig {
    #[serde(default = "default_ttl_days")]
    pub ttl_days: i32,

    /// Code generation attempts before giving up on collisions
    #[serde(default = "default_max_code_attempts")]
    pub max_code_attempts: u32,

    /// Path of the registration page, appended to `server.app_base_url`
    #[serde(default = "default_registration_path")]
    pub registration_path: String,

    /// Include raw transport errors in API responses (operators only).
    #[serde(default)]
    pub expose_delivery_detail: bool,
}

impl Default for InvitationsConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_ttl_days(),
            max_code_attempts: default_max_code_attempts(),
            registration_path: default_registration_path(),
            expose_delivery_detail: false,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_app_base_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_access_token_expiry() -> i64 {
    3600
}
fn default_jwt_leeway() -> u64 {
    shared::jwt::DEFAULT_LEEWAY_SECS
}
fn default_email_provider() -> String {
    "console".to_string()
}
fn default_sender_email() -> String {
    "convites@mentorinvite.app".to_string()
}
fn default_sender_name() -> String {
    "Mentor Invite".to_string()
}
fn default_resend_api_base() -> String {
    "https://api.resend.com".to_string()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_true() -> bool {
    true
}
fn default_email_timeout() -> u64 {
    10
}
fn default_ttl_days() -> i32 {
    INVITATION_TTL_DAYS as i32
}
fn default_max_code_attempts() -> u32 {
    MAX_CODE_GENERATION_ATTEMPTS
}
fn default_registration_path() -> String {
    "/register".to_string()
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml
    /// 2. config/local.toml (optional, not in git)
    /// 3. Environment variables with the MI__ prefix, e.g. MI__EMAIL__PROVIDER
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("MI").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Builds a config from embedded defaults plus overrides, without
    /// touching the file system.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30
            app_base_url = "http://localhost:3000"

            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []

            [jwt]
            private_key = "test-private-key"
            public_key = "test-public-key"
            access_token_expiry_secs = 3600
            leeway_secs = 30

            [email]
            provider = "console"
            sender_email = "test@example.com"
            sender_name = "Test"

            [invitations]
            ttl_days = 7
            max_code_attempts = 5
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "MI__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        let provider = self
            .email
            .mail_provider()
            .map_err(ConfigValidationError::InvalidValue)?;

        if provider == MailProvider::Smtp && self.email.smtp_host.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "MI__EMAIL__SMTP_HOST must be set for the smtp provider".to_string(),
            ));
        }

        if self.invitations.ttl_days <= 0 {
            return Err(ConfigValidationError::InvalidValue(
                "invitations.ttl_days must be positive".to_string(),
            ));
        }

        if self.invitations.max_code_attempts == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "invitations.max_code_attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }

    /// Absolute registration link, without the code.
    pub fn registration_url(&self) -> String {
        format!(
            "{}{}",
            self.server.app_base_url.trim_end_matches('/'),
            self.invitations.registration_path
        )
    }
}
