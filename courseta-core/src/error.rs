//! Unified error handling
//!
//! One error enum for the whole system, with enough context attached to
//! tell a caller-side input problem from a source-side fetch problem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type CoursetaResult<T> = Result<T, CoursetaError>;

/// Context attached to every structured error for debugging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking across log lines
    pub error_id: String,
    /// When the error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where the error originated
    pub component: String,
    /// Operation being performed
    pub operation: Option<String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for the Courseta system
#[derive(Error, Debug)]
pub enum CoursetaError {
    /// A required credential or setting is missing. Fatal, never retried.
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    /// A source rejected our credentials. Fatal for the ingestion run.
    #[error("Authentication failed ({status}): {message}")]
    Authentication {
        message: String,
        status: u16,
        /// Response body returned by the source, kept for diagnostics
        body: String,
        context: ErrorContext,
    },

    /// A single page/topic/file fetch failed. Logged and absorbed by the
    /// caller; never aborts an ingestion run.
    #[error("Source fetch error: {message}")]
    SourceFetch {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    /// Malformed client-supplied data. Surfaced to the caller, no retry.
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    /// The synthesis pipeline blew its latency budget.
    #[error("Deadline exceeded in {operation}: {elapsed_ms}ms elapsed, {budget_ms}ms budget")]
    DeadlineExceeded {
        operation: String,
        elapsed_ms: u64,
        budget_ms: u64,
        context: ErrorContext,
    },

    /// Any other failure during answer synthesis, cause attached.
    #[error("Processing error: {message}")]
    Processing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoursetaError {
    /// Get the error context, if the variant carries one
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            CoursetaError::Config { context, .. } => Some(context),
            CoursetaError::Authentication { context, .. } => Some(context),
            CoursetaError::SourceFetch { context, .. } => Some(context),
            CoursetaError::InvalidInput { context, .. } => Some(context),
            CoursetaError::DeadlineExceeded { context, .. } => Some(context),
            CoursetaError::Processing { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Whether this error is the caller's fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, CoursetaError::InvalidInput { .. })
    }

    /// HTTP status code equivalent for the web layer
    pub fn status_code(&self) -> u16 {
        match self {
            CoursetaError::InvalidInput { .. } => 400,
            CoursetaError::Authentication { .. } => 401,
            CoursetaError::DeadlineExceeded { .. } => 504,
            _ => 500,
        }
    }
}

/// Convenience constructors for the common cases
impl CoursetaError {
    pub fn config(message: impl Into<String>, component: &str) -> Self {
        CoursetaError::Config {
            message: message.into(),
            source: None,
            context: ErrorContext::new(component)
                .with_suggestion("Check your environment variables and config file"),
        }
    }

    pub fn source_fetch(
        message: impl Into<String>,
        component: &str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        CoursetaError::SourceFetch {
            message: message.into(),
            source: Some(Box::new(source)),
            context: ErrorContext::new(component),
        }
    }

    pub fn invalid_input(message: impl Into<String>, field: &str, component: &str) -> Self {
        CoursetaError::InvalidInput {
            message: message.into(),
            field: Some(field.to_string()),
            context: ErrorContext::new(component).with_suggestion("Check the field value and format"),
        }
    }

    pub fn processing(
        message: impl Into<String>,
        component: &str,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        CoursetaError::Processing {
            message: message.into(),
            source,
            context: ErrorContext::new(component),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_builder() {
        let context = ErrorContext::new("ingest")
            .with_operation("fetch_topics")
            .with_suggestion("Check network connectivity");

        assert_eq!(context.component, "ingest");
        assert_eq!(context.operation.as_deref(), Some("fetch_topics"));
        assert_eq!(context.recovery_suggestions.len(), 1);
    }

    #[test]
    fn test_status_code_mapping() {
        let invalid = CoursetaError::invalid_input("bad base64", "image", "web");
        assert_eq!(invalid.status_code(), 400);
        assert!(invalid.is_client_error());

        let deadline = CoursetaError::DeadlineExceeded {
            operation: "answer".to_string(),
            elapsed_ms: 31_000,
            budget_ms: 30_000,
            context: ErrorContext::new("answer"),
        };
        assert_eq!(deadline.status_code(), 504);
        assert!(!deadline.is_client_error());

        let processing = CoursetaError::processing("upstream 503", "answer", None);
        assert_eq!(processing.status_code(), 500);
    }
}
