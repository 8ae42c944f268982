use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use domain::services::{MailTransport, PrincipalStore};
use persistence::repositories::{
    pg_client_directory, InvitationCodeRepository, PgClientDirectory, ProfileRepository,
};
use shared::jwt::{JwtConfig, JwtError};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_authenticated, require_mentor, resolve_session,
    trace_id,
};
use crate::routes::{clients, health, invitations, profiles};
use crate::services::email::{
    create_transport, DeliveryPipeline, EmailError, InvitationEmailRenderer,
};
use crate::services::{InvitationService, InvitationSettings, RegistrationService};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    pub invitations: Arc<InvitationService>,
    pub registration: Arc<RegistrationService>,
    pub profiles: Arc<dyn PrincipalStore>,
    pub client_directory: Arc<PgClientDirectory>,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("JWT configuration error: {0}")]
    Jwt(#[from] JwtError),

    #[error("Email configuration error: {0}")]
    Email(#[from] EmailError),
}

/// Builds the router with the mail transport named in the config.
pub fn create_app(config: Config, pool: PgPool) -> Result<Router, StartupError> {
    let transport = create_transport(&config.email)?;
    create_app_with_transport(config, pool, transport)
}

pub fn create_app_with_transport(
    config: Config,
    pool: PgPool,
    transport: Arc<dyn MailTransport>,
) -> Result<Router, StartupError> {
    let config = Arc::new(config);

    let jwt = JwtConfig::new(
        &config.jwt.private_key,
        &config.jwt.public_key,
        config.jwt.access_token_expiry_secs,
        config.jwt.leeway_secs,
    )?;

    let invitation_store = Arc::new(
        InvitationCodeRepository::new(pool.clone()).with_ttl_days(config.invitations.ttl_days),
    );
    let profiles: Arc<dyn PrincipalStore> = Arc::new(ProfileRepository::new(pool.clone()));

    let invitations = InvitationService::new(
        invitation_store.clone(),
        profiles.clone(),
        DeliveryPipeline::new(transport),
        InvitationEmailRenderer::new(config.registration_url()),
        InvitationSettings {
            max_code_attempts: config.invitations.max_code_attempts,
            expose_delivery_detail: config.invitations.expose_delivery_detail,
        },
    );
    let registration = RegistrationService::new(invitation_store, profiles.clone());

    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
        jwt: Arc::new(jwt),
        invitations: Arc::new(invitations),
        registration: Arc::new(registration),
        profiles,
        client_directory: Arc::new(pg_client_directory(pool)),
    };

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Mentor-only routes
    let mentor_routes = Router::new()
        .route(
            "/api/v1/invitations",
            get(invitations::list_invitations).post(invitations::create_invitation),
        )
        .route(
            "/api/v1/invitations/:invitation_id/resend",
            post(invitations::resend_invitation),
        )
        .route("/api/v1/clients", get(clients::list_clients))
        .route_layer(middleware::from_fn(require_mentor));

    // Any signed-in principal
    let authenticated_routes = Router::new()
        .route("/api/v1/profiles/:profile_id", get(profiles::get_profile))
        .route_layer(middleware::from_fn(require_authenticated));

    // Session resolution runs before the role guards above.
    let session_routes = Router::new()
        .merge(mentor_routes)
        .merge(authenticated_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), resolve_session));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route(
            "/api/v1/invitations/redeem",
            post(invitations::redeem_invitation),
        )
        .route("/metrics", get(metrics_handler));

    Ok(Router::new()
        .merge(public_routes)
        .merge(session_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state))
}
