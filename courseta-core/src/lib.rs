//! Courseta Core - shared data structures, errors, and configuration
//!
//! Everything the ingestion and answer pipelines have in common lives here:
//! the snapshot data model, the error taxonomy, and env/TOML configuration.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use types::*;

// Re-export commonly used external types
pub use chrono;
pub use tracing;
