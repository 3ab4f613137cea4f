//! Application state
//!
//! The snapshot lives behind one `RwLock<Arc<_>>`: handlers clone the
//! `Arc` out and release the lock before any await on the completion
//! service, so a reload never blocks in-flight answers and a request
//! always sees one consistent snapshot.

use crate::WebConfig;
use courseta_answer::{AnswerPipeline, CompletionClient};
use courseta_core::{CompletionConfig, CoursetaResult, Snapshot};
use courseta_ingest::SnapshotStore;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: WebConfig,
    /// Answer synthesis pipeline
    pub pipeline: Arc<AnswerPipeline>,
    snapshot: Arc<RwLock<Arc<Snapshot>>>,
    store: Arc<SnapshotStore>,
}

impl AppState {
    /// Build state for production: completion client from the
    /// environment, snapshot loaded once from disk (or empty).
    pub fn new(config: WebConfig) -> CoursetaResult<Self> {
        let completion = CompletionClient::new(&CompletionConfig::from_env())?;
        let pipeline = AnswerPipeline::new(Box::new(completion));
        Ok(Self::with_pipeline(config, pipeline))
    }

    /// Build state around an explicit pipeline; tests inject a fake
    /// completion service through here.
    pub fn with_pipeline(config: WebConfig, pipeline: AnswerPipeline) -> Self {
        let store = SnapshotStore::new(&config.snapshot_path);
        let snapshot = Arc::new(store.load_or_empty());

        Self {
            config,
            pipeline: Arc::new(pipeline),
            snapshot: Arc::new(RwLock::new(snapshot)),
            store: Arc::new(store),
        }
    }

    /// Current snapshot handle; cheap to clone, immutable to hold
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().await.clone()
    }

    /// Swap in the latest persisted snapshot after an ingestion run
    pub async fn reload_snapshot(&self) -> Arc<Snapshot> {
        let fresh = Arc::new(self.store.load_or_empty());
        *self.snapshot.write().await = fresh.clone();
        info!(
            "Snapshot reloaded ({} posts, {} files)",
            fresh.discourse.len(),
            fresh.github.len()
        );
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courseta_answer::{ChatMessage, CompletionApi};

    struct NullCompletion;

    #[async_trait]
    impl CompletionApi for NullCompletion {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            _max_tokens: u32,
        ) -> CoursetaResult<String> {
            Ok(r#"{"answer":"ok","links":[]}"#.to_string())
        }
    }

    #[tokio::test]
    async fn test_missing_snapshot_degrades_to_empty() {
        let config = WebConfig {
            snapshot_path: "/nonexistent/path/data.json".to_string(),
            ..Default::default()
        };
        let state = AppState::with_pipeline(config, AnswerPipeline::new(Box::new(NullCompletion)));

        let snapshot = state.snapshot().await;
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_reload_picks_up_new_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let config = WebConfig {
            snapshot_path: path.to_string_lossy().into_owned(),
            ..Default::default()
        };
        let state = AppState::with_pipeline(
            config,
            AnswerPipeline::new(Box::new(NullCompletion)),
        );
        assert!(state.snapshot().await.is_empty());

        let store = SnapshotStore::new(&path);
        let snapshot = Snapshot {
            discourse: Vec::new(),
            github: vec![courseta_core::RepoFile {
                path: "README.md".to_string(),
                content: "# Course".to_string(),
            }],
            fetched_at: chrono::Utc::now(),
        };
        store.save(&snapshot).unwrap();

        let reloaded = state.reload_snapshot().await;
        assert_eq!(reloaded.github.len(), 1);
        assert_eq!(state.snapshot().await.github.len(), 1);
    }
}
