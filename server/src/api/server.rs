//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use super::auth::{
    AuthState, IdentityResolver, LocalIdentityResolver, SessionIdentityResolver, require_auth,
};
use super::middleware::{self, AllowedOrigins};
use super::openapi::{openapi_json, swagger_ui_html};
use super::routes::{
    api_keys, auth, health, organizations, prompts, scenarios, simulate, variables,
};
use crate::core::CoreApp;
use crate::core::constants::{AUTH_BODY_LIMIT, DEFAULT_BODY_LIMIT};
use crate::domain::{
    MembershipService, OrgContextResolver, PromptService, ProviderKeyService, ScenarioService,
    SimulationService, VariableService,
};
use crate::utils::encryption::EncryptionService;

/// Assemble the full HTTP router for `app`
pub fn build_router(app: &CoreApp) -> Router {
    let database = app.database.clone();
    let allowed_origins = AllowedOrigins::new(&app.config.server.host, app.config.server.port);

    let identity: Arc<dyn IdentityResolver> = if app.auth.is_enabled() {
        Arc::new(SessionIdentityResolver::new(
            app.auth.clone(),
            database.clone(),
        ))
    } else {
        Arc::new(LocalIdentityResolver::new(database.clone()))
    };
    let auth_state = AuthState {
        identity,
        org_context: Arc::new(OrgContextResolver::new(database.clone())),
        allowed_origins: allowed_origins.clone(),
        check_origin: app.auth.is_enabled(),
    };

    let membership =
        MembershipService::new(database.clone(), app.config.features.invitations_enabled);
    let prompt_service = PromptService::new(database.clone());
    let scenario_service = ScenarioService::new(database.clone());
    let variable_service = VariableService::new(database.clone());
    let encryption = app
        .config
        .security
        .encryption_secret
        .as_deref()
        .map(EncryptionService::from_secret);
    let provider_keys = ProviderKeyService::new(database.clone(), encryption);
    let simulation = SimulationService::new(
        scenario_service.clone(),
        variable_service.clone(),
        provider_keys.clone(),
        app.llm.clone(),
    );

    let auth_routes =
        auth::routes(app.auth.clone(), database.clone()).layer(DefaultBodyLimit::max(AUTH_BODY_LIMIT));

    // Every tenant route runs behind the same identity middleware
    let protected = |router: Router| router.layer(from_fn_with_state(auth_state.clone(), require_auth));

    Router::new()
        .route("/api/health", get(health::health).with_state(database))
        .route("/api/openapi.json", get(openapi_json))
        .route("/api/docs", get(swagger_ui_html))
        .route("/api/docs/", get(swagger_ui_html))
        .nest("/api/auth", auth_routes)
        .nest("/api/orgs", protected(organizations::routes(membership)))
        .nest("/api/prompts", protected(prompts::routes(prompt_service)))
        .nest("/api/scenarios", protected(scenarios::routes(scenario_service)))
        .nest("/api/variables", protected(variables::routes(variable_service)))
        .nest("/api/user/api-keys", protected(api_keys::routes(provider_keys)))
        .nest(
            "/api/simulate",
            protected(simulate::routes(simulation, app.shutdown.subscribe())),
        )
        .fallback(middleware::handle_404)
        .layer(CompressionLayer::new())
        .layer(middleware::cors(&allowed_origins))
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
}

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Serve until shutdown is triggered; returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let app = self.app;
        let shutdown = app.shutdown.clone();

        let addr = SocketAddr::new(app.config.server.host.parse()?, app.config.server.port);
        let router = build_router(&app);

        let listener = TcpListener::bind(addr).await?;
        tracing::debug!(%addr, "HTTP server listening");
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.wait())
        .await?;

        Ok(app)
    }
}
