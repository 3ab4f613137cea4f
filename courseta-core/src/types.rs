//! Core data type definitions
//!
//! The snapshot is the only thing the ingestion and answer pipelines
//! share: ingestion writes it whole, synthesis reads it whole.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single post from a Discourse topic thread, immutable once fetched.
/// Unique by `(topic_id, post_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumPost {
    pub topic_id: u64,
    /// Title of the topic the post belongs to
    pub title: String,
    pub post_id: u64,
    /// Rendered ("cooked") HTML content of the post
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Canonical URL of the post: `{base}/t/{topic_id}/{post_number}`
    pub url: String,
}

/// A text file pulled from the course repository. Unique by path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoFile {
    /// Slash-separated path relative to the repository root
    pub path: String,
    /// UTF-8 decoded file content
    pub content: String,
}

/// The versioned corpus: everything one ingestion run collected.
///
/// A snapshot is immutable once written and is always replaced whole,
/// never patched. Readers see either the previous snapshot or this one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub discourse: Vec<ForumPost>,
    pub github: Vec<RepoFile>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// Snapshot with no data, used before the first ingestion run
    pub fn empty() -> Self {
        Self {
            discourse: Vec::new(),
            github: Vec::new(),
            fetched_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.discourse.is_empty() && self.github.is_empty()
    }
}

/// A student question. The image bytes are opaque: they are validated
/// and acknowledged to the model, never interpreted or forwarded.
#[derive(Debug, Clone)]
pub struct Question {
    pub text: String,
    pub image: Option<Vec<u8>>,
}

/// A link accompanying an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerLink {
    pub url: String,
    /// Human-readable description of the link
    pub text: String,
}

/// The synthesized answer returned to the student
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    /// At most two supporting links
    #[serde(default)]
    pub links: Vec<AnswerLink>,
}

/// Maximum number of links an answer may carry
pub const MAX_ANSWER_LINKS: usize = 2;

impl Answer {
    /// Drop any links beyond the allowed maximum, keeping order
    pub fn clamp_links(mut self) -> Self {
        self.links.truncate(MAX_ANSWER_LINKS);
        self
    }
}
