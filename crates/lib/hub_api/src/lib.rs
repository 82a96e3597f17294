//! # hub_api
//!
//! HTTP API library for Service Hub.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Extension, State};
use axum::routing::{get, post};
use hub_core::credentials::CredentialStore;
use hub_core::llm::TextGenerator;
use hub_core::tasks::registry::TASKS;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{api_keys, auth, health, tasks};
use crate::middleware::api_key::{ApiKeyContext, MAX_BODY_BYTES};
use crate::startup::Readiness;

/// Path prefix under which every task route is also served.
pub const SERVICES_PREFIX: &str = "/api/services";

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool.
    pub pool: PgPool,
    /// API configuration.
    pub config: ApiConfig,
    /// API key storage.
    pub credentials: Arc<dyn CredentialStore>,
    /// Language model used by every task.
    pub generator: Arc<dyn TextGenerator>,
    /// Results of the startup checks.
    pub readiness: Readiness,
}

/// Run embedded database migrations.
///
/// Delegates to `hub_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    hub_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/health/", get(health::health_handler))
        .route("/ready/", get(health::ready_handler))
        .route("/signup/", post(auth::signup_handler))
        .route("/login/", post(auth::login_handler))
        .route("/logout/", post(auth::logout_handler))
        .route("/refresh/", post(auth::refresh_handler));

    // Session routes (require a signed-in account)
    let session = Router::new()
        .route("/dashboard/", get(api_keys::dashboard_handler))
        .route(
            "/regenerate-api-key/",
            post(api_keys::regenerate_handler),
        )
        .route(
            "/api-key/deactivate/",
            post(api_keys::deactivate_handler),
        )
        .route("/api-key/activate/", post(api_keys::activate_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    // Task routes; the API key gate below decides access by path.
    let mut task_routes = Router::new();
    for task in TASKS.iter() {
        let path = format!("/{}/", task.kind.slug());
        let handler = post(
            move |state: State<AppState>, caller: Extension<ApiKeyContext>, body: Bytes| {
                tasks::task_handler(task, state, caller, body)
            },
        );
        task_routes = task_routes
            .route(&format!("{SERVICES_PREFIX}{path}"), handler.clone())
            .route(&path, handler);
    }
    let task_routes = task_routes.layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    Router::new()
        .merge(public)
        .merge(session)
        .merge(task_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::api_key::require_api_key,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
