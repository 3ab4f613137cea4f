//! Snapshot merging and persistence
//!
//! The two sources run as independent units of work: either may fail
//! entirely and ingestion still produces a snapshot, just a degraded one.
//! Persistence is temp-file-plus-rename so a reader never sees a torn
//! write; concurrent readers observe either the old document or the new
//! one, never a mix.

use crate::discourse::{ForumApi, ForumScraper};
use crate::github::{RepoApi, RepoWalker};
use chrono::{DateTime, Utc};
use courseta_core::{CoursetaResult, Snapshot};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Run the forum scrape and the repository walk and merge the results.
///
/// Failures inside one source degrade that source to an empty sequence;
/// they never propagate out of here.
pub async fn build_snapshot<F, R>(
    scraper: &ForumScraper<F>,
    walker: &RepoWalker<R>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Snapshot
where
    F: ForumApi,
    R: RepoApi,
{
    let discourse = match scraper.scrape(start, end).await {
        Ok(posts) => {
            info!("Retrieved {} Discourse posts", posts.len());
            posts
        }
        Err(e) => {
            error!("Discourse scrape failed, continuing with empty forum data: {}", e);
            Vec::new()
        }
    };

    let github = match walker.walk().await {
        Ok(results) => {
            let mut files = Vec::new();
            for result in results {
                match result {
                    Ok(file) => files.push(file),
                    Err(skipped) => {
                        warn!("Skipping {}: {}", skipped.path, skipped.reason);
                    }
                }
            }
            info!("Retrieved {} GitHub files", files.len());
            files
        }
        Err(e) => {
            error!("GitHub walk failed, continuing with empty repo data: {}", e);
            Vec::new()
        }
    };

    Snapshot {
        discourse,
        github,
        fetched_at: Utc::now(),
    }
}

/// On-disk home of the persisted snapshot
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Atomically replace the persisted snapshot.
    ///
    /// The document is fully written to a sibling temp file first; the
    /// rename is the single visible step.
    pub fn save(&self, snapshot: &Snapshot) -> CoursetaResult<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        let temp = self.temp_path();

        std::fs::write(&temp, json)?;
        std::fs::rename(&temp, &self.path)?;

        info!(
            "Snapshot saved to {} ({} posts, {} files)",
            self.path.display(),
            snapshot.discourse.len(),
            snapshot.github.len()
        );
        Ok(())
    }

    /// Read the whole persisted snapshot
    pub fn load(&self) -> CoursetaResult<Snapshot> {
        let content = std::fs::read_to_string(&self.path)?;
        let snapshot = serde_json::from_str(&content)?;
        Ok(snapshot)
    }

    /// Snapshot for process start: missing or unreadable files degrade to
    /// an empty corpus instead of refusing to boot.
    pub fn load_or_empty(&self) -> Snapshot {
        match self.load() {
            Ok(snapshot) => {
                info!(
                    "Loaded snapshot from {} ({} posts, {} files)",
                    self.path.display(),
                    snapshot.discourse.len(),
                    snapshot.github.len()
                );
                snapshot
            }
            Err(e) => {
                warn!(
                    "No usable snapshot at {} ({}), starting with an empty corpus",
                    self.path.display(),
                    e
                );
                Snapshot::empty()
            }
        }
    }
}
