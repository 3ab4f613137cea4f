//! Courseta Web - HTTP surface for answer synthesis
//!
//! One real operation: POST a question, get a grounded answer back. The
//! snapshot is loaded once at startup and threaded through requests as a
//! cheap reference-counted handle.

pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use server::CoursetaServer;
pub use state::AppState;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        // keep room for a base64 screenshot in the request body
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .with_state(state)
}

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable development mode
    pub dev_mode: bool,
    /// Where the persisted snapshot lives
    pub snapshot_path: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            dev_mode: false,
            snapshot_path: "course_data.json".to_string(),
        }
    }
}

impl WebConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("COURSETA_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("COURSETA_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            dev_mode: std::env::var("COURSETA_DEV_MODE")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            snapshot_path: std::env::var("COURSETA_SNAPSHOT_PATH")
                .unwrap_or_else(|_| "course_data.json".to_string()),
        }
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WebConfig::default();
        assert_eq!(config.address(), "127.0.0.1:8080");
        assert!(!config.dev_mode);
        assert_eq!(config.snapshot_path, "course_data.json");
    }
}
