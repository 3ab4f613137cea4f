//! Configuration management
//!
//! Non-secret settings come from a TOML file or defaults; credentials are
//! only ever read from the environment so they stay out of config files.

use crate::error::{CoursetaError, CoursetaResult, ErrorContext};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one ingestion run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Base URL of the Discourse forum
    pub discourse_base_url: String,
    /// Category listing path under the forum base, without `.json`
    pub category_path: String,
    /// Base URL of the GitHub REST API
    pub github_api_url: String,
    /// Course repository as `owner/name`
    pub github_repo: String,
    /// File extensions kept by the repository walk
    pub allowed_extensions: Vec<String>,
    /// Safety limit on category pagination
    pub max_pages: u32,
    /// HTTP request timeout in seconds
    pub timeout_seconds: u64,
    /// Where the persisted snapshot lives
    pub snapshot_path: String,

    /// Discourse `_t` session cookie, from `DISCOURSE_T_COOKIE`
    #[serde(skip)]
    pub discourse_t_cookie: Option<String>,
    /// Discourse `_forum_session` cookie, from `DISCOURSE_SESSION_COOKIE`
    #[serde(skip)]
    pub discourse_session_cookie: Option<String>,
    /// GitHub access token, from `GITHUB_TOKEN`
    #[serde(skip)]
    pub github_token: Option<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            discourse_base_url: "https://discourse.onlinedegree.iitm.ac.in".to_string(),
            category_path: "c/courses/tds-kb/34".to_string(),
            github_api_url: "https://api.github.com".to_string(),
            github_repo: "sanand0/tools-in-data-science-public".to_string(),
            allowed_extensions: vec!["md".to_string(), "ipynb".to_string(), "py".to_string()],
            max_pages: 500,
            timeout_seconds: 30,
            snapshot_path: "course_data.json".to_string(),
            discourse_t_cookie: None,
            discourse_session_cookie: None,
            github_token: None,
        }
    }
}

impl IngestConfig {
    /// Defaults plus credentials from the environment
    pub fn from_env() -> Self {
        Self::default().with_env_credentials()
    }

    /// Load non-secret settings from a TOML file, then apply credentials
    /// from the environment
    pub fn from_file<P: AsRef<Path>>(path: P) -> CoursetaResult<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| CoursetaError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: IngestConfig = toml::from_str(&content).map_err(|e| CoursetaError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        Ok(config.with_env_credentials())
    }

    fn with_env_credentials(mut self) -> Self {
        self.discourse_t_cookie = std::env::var("DISCOURSE_T_COOKIE").ok();
        self.discourse_session_cookie = std::env::var("DISCOURSE_SESSION_COOKIE").ok();
        self.github_token = std::env::var("GITHUB_TOKEN").ok();
        self
    }

    /// Owner and repository name split out of `github_repo`
    pub fn repo_parts(&self) -> CoursetaResult<(&str, &str)> {
        self.github_repo
            .split_once('/')
            .ok_or_else(|| CoursetaError::Config {
                message: format!("github_repo must be 'owner/name', got '{}'", self.github_repo),
                source: None,
                context: ErrorContext::new("config").with_operation("repo_parts"),
            })
    }
}

/// Settings for the completion service
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Base URL of the OpenAI-compatible proxy
    pub base_url: String,
    /// Model name sent with every request
    pub model: String,
    /// Bearer token, from `AIPROXY_TOKEN`
    pub api_key: Option<String>,
    /// Token budget for one completion
    pub max_tokens: u32,
    /// HTTP request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://aiproxy.sanand.workers.dev/openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            max_tokens: 500,
            timeout_seconds: 30,
        }
    }
}

impl CompletionConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("AIPROXY_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = std::env::var("COURSETA_MODEL") {
            config.model = model;
        }
        config.api_key = std::env::var("AIPROXY_TOKEN").ok();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IngestConfig::default();
        assert_eq!(config.category_path, "c/courses/tds-kb/34");
        assert_eq!(config.max_pages, 500);
        assert!(config.allowed_extensions.contains(&"md".to_string()));
        assert!(config.discourse_t_cookie.is_none());
    }

    #[test]
    fn test_repo_parts() {
        let config = IngestConfig::default();
        let (owner, name) = config.repo_parts().unwrap();
        assert_eq!(owner, "sanand0");
        assert_eq!(name, "tools-in-data-science-public");

        let bad = IngestConfig {
            github_repo: "no-slash".to_string(),
            ..Default::default()
        };
        assert!(bad.repo_parts().is_err());
    }

    #[test]
    fn test_config_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courseta.toml");
        std::fs::write(
            &path,
            r#"
category_path = "c/courses/other/12"
max_pages = 10
allowed_extensions = ["md"]
"#,
        )
        .unwrap();

        let config = IngestConfig::from_file(&path).unwrap();
        assert_eq!(config.category_path, "c/courses/other/12");
        assert_eq!(config.max_pages, 10);
        assert_eq!(config.allowed_extensions, vec!["md".to_string()]);
        // untouched fields keep their defaults
        assert_eq!(config.github_api_url, "https://api.github.com");
    }

    #[test]
    fn test_config_from_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "max_pages = [not valid").unwrap();

        let result = IngestConfig::from_file(&path);
        assert!(matches!(result, Err(CoursetaError::Config { .. })));
    }
}
