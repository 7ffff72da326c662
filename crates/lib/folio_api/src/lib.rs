//! # folio_api
//!
//! HTTP API library for Folio.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use folio_core::auth::jwt::TokenIssuer;
use folio_core::cipher::IdCipher;
use folio_core::models::UserType;
use folio_core::notify::Notifier;
use folio_core::store::UserStore;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{auth, health, users};
use crate::middleware::auth::{AuthGuard, authorize};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: ApiConfig,
    /// User and credential persistence.
    pub store: Arc<dyn UserStore>,
    /// Outbound email/SMS delivery.
    pub notifier: Arc<dyn Notifier>,
    /// Access/reset token signing and verification.
    pub tokens: TokenIssuer,
    /// Obfuscation of ids exposed in URLs and payloads.
    pub cipher: IdCipher,
}

impl AppState {
    /// Build state, deriving the token issuer and id cipher from the
    /// configured secrets.
    pub fn new(
        config: ApiConfig,
        store: Arc<dyn UserStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let tokens = TokenIssuer::from_config(&config.secrets);
        let cipher = IdCipher::from_config(&config.secrets);
        Self {
            config,
            store,
            notifier,
            tokens,
            cipher,
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `folio_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    folio_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::GET_HEALTH, get(health::health_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler))
        .route(
            routes::POST_AUTH_FORGOT_PASSWORD,
            post(auth::forgot_password_handler),
        )
        .route(
            routes::POST_AUTH_RESET_PASSWORD,
            post(auth::reset_password_handler),
        );

    // Any active user
    let protected = Router::new()
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler))
        .route(
            routes::USERS_ME,
            get(users::me_handler).patch(users::update_me_handler),
        )
        .route(
            routes::POST_USERS_ME_PASSWORD,
            post(users::change_password_handler),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            AuthGuard::any(state.clone()),
            authorize,
        ));

    // SupAdmin only
    let admin = Router::new()
        .route(routes::POST_ADMIN_USERS, post(users::create_user_handler))
        .route(
            routes::PATCH_ADMIN_USERS_ID_STATUS,
            patch(users::set_status_handler),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            AuthGuard::requiring(state.clone(), UserType::SuperAdmin),
            authorize,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
