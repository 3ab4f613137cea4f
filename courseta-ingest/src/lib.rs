//! Courseta Ingest - corpus collection from Discourse and GitHub
//!
//! This crate produces the snapshot the answer pipeline reads: it
//! authenticates against the course forum, paginates the course category,
//! walks the course repository tree, and merges both into one atomically
//! persisted document. Collection is best-effort throughout: a single bad
//! page, topic, or file contributes nothing instead of aborting the run.

pub mod discourse;
pub mod github;
pub mod snapshot;

pub use discourse::{DiscourseClient, ForumApi, ForumScraper, TopicSummary};
pub use github::{EntryKind, GitHubClient, RepoApi, RepoEntry, RepoWalker, SkipReason, Skipped};
pub use snapshot::{build_snapshot, SnapshotStore};
