//! Route definitions

use crate::{handlers, AppState};
use axum::{
    routing::{get, post},
    Router,
};

/// Routes nested under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // the one real operation: question in, answer out
        .route("/", post(handlers::ask))
        .route("/health", get(handlers::health))
        .route("/snapshot/reload", post(handlers::reload_snapshot))
}
