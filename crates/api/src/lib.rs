//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST routes over the store orchestrators
//! - The error-to-response mapping shared by every handler

pub mod error;
pub mod routes;

use axum::Router;
use corebank_core::task::TaskOptions;
use corebank_db::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Ledger store and transaction executor.
    pub store: Store,
    /// Options of the verification email enqueued on sign-up.
    pub verify_email: TaskOptions,
}

impl AppState {
    /// Creates state with the default verification email options.
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self {
            store,
            verify_email: routes::users::verify_email_options(),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
