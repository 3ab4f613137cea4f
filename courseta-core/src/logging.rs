//! Logging setup
//!
//! Structured logging via tracing, configured through `RUST_LOG` with a
//! sensible per-crate default.

use tracing_subscriber::EnvFilter;

/// Default filter directives when `RUST_LOG` is unset
const DEFAULT_DIRECTIVES: &str =
    "courseta_core=info,courseta_ingest=info,courseta_answer=info,courseta_web=info,tower_http=info";

/// Initialize the global tracing subscriber.
///
/// Safe to call once per process; binaries call this before anything
/// else. The fmt subscriber also captures records emitted through the
/// `log` facade.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_DIRECTIVES.into()),
        )
        .init();
}

/// Initialize logging with an explicit level for our crates,
/// overriding `RUST_LOG`.
pub fn init_logging_with_level(level: &str) {
    let directives = format!(
        "courseta_core={level},courseta_ingest={level},courseta_answer={level},courseta_web={level}",
    );
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directives))
        .init();
}
