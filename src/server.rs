//! # Server Configuration
//!
//! This module contains the router assembly, shared state and OpenAPI
//! document for the leadbook API.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::trace::TraceLayer;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::auth_middleware;
use crate::config::{AppConfig, ConfigError};
use crate::crypto::SessionKeys;
use crate::handlers;
use crate::leads::LeadService;
use crate::rate_limit::RateLimits;
use crate::telemetry::trace_context_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub sessions: Arc<SessionKeys>,
    pub rate_limits: RateLimits,
    pub leads: LeadService,
}

impl AppState {
    /// Builds state with the in-process rate limiters from `config`.
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Result<Self, ConfigError> {
        let rate_limits = RateLimits::from_config(&config.rate_limit);
        Self::with_rate_limits(config, db, rate_limits)
    }

    /// Builds state around externally provided limiters.
    pub fn with_rate_limits(
        config: AppConfig,
        db: DatabaseConnection,
        rate_limits: RateLimits,
    ) -> Result<Self, ConfigError> {
        let sessions = Arc::new(SessionKeys::from_config(&config)?);
        let db = Arc::new(db);

        Ok(Self {
            config: Arc::new(config),
            leads: LeadService::new(Arc::clone(&db)),
            db,
            sessions,
            rate_limits,
        })
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/leads",
            get(handlers::leads::list_leads).post(handlers::leads::create_lead),
        )
        .route("/leads/export", get(handlers::leads::export_leads_csv))
        .route(
            "/leads/{id}",
            get(handlers::leads::get_lead)
                .put(handlers::leads::update_lead)
                .delete(handlers::leads::delete_lead),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/auth/signin", post(handlers::auth::sign_in))
        .merge(protected)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_context_middleware))
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;
    let profile = config.profile.clone();

    let state = AppState::new(config, db)?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::auth::sign_in,
        crate::handlers::leads::list_leads,
        crate::handlers::leads::export_leads_csv,
        crate::handlers::leads::create_lead,
        crate::handlers::leads::get_lead,
        crate::handlers::leads::update_lead,
        crate::handlers::leads::delete_lead,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::types::HealthResponse,
            crate::handlers::types::SignInRequest,
            crate::handlers::types::SignInResponse,
            crate::handlers::types::UserSummary,
            crate::handlers::types::LeadRequest,
            crate::handlers::types::LeadResponse,
            crate::handlers::types::OwnerSummary,
            crate::handlers::types::LeadListResponse,
            crate::handlers::types::DeleteResponse,
            crate::listing::Pagination,
            crate::validation::FieldIssue,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "leads", description = "Buyer lead management"),
        (name = "auth", description = "Session tokens"),
        (name = "root", description = "Service metadata and health"),
    ),
    info(
        title = "Leadbook API",
        description = "Buyer lead management for real-estate agents",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
