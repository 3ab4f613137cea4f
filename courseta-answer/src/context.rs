//! Context assembly
//!
//! Rendering is deliberately dumb: every post and file in snapshot order,
//! one space between entries, hard cut at the length limit. Truncation
//! instead of ranking is a latency tradeoff, not an oversight.

use courseta_core::Snapshot;

/// Hard limit on the assembled context block, in characters
pub const MAX_CONTEXT_CHARS: usize = 5000;

/// Render the snapshot into the single text block fed to the model
pub fn assemble_context(snapshot: &Snapshot) -> String {
    let mut parts = Vec::with_capacity(snapshot.discourse.len() + snapshot.github.len());

    for post in &snapshot.discourse {
        parts.push(format!(
            "Discourse Post (Topic: {}, URL: {}): {}",
            post.title, post.url, post.content
        ));
    }
    for file in &snapshot.github {
        parts.push(format!("GitHub File ({}): {}", file.path, file.content));
    }

    truncate_chars(parts.join(" "), MAX_CONTEXT_CHARS)
}

/// Cut a string at `max` characters without splitting a code point
fn truncate_chars(mut text: String, max: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max) {
        text.truncate(idx);
    }
    text
}
