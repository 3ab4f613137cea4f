//! GitHub repository client and tree walker
//!
//! Directories are expanded lazily through the contents API; the walk
//! itself never aborts on a single bad entry. Skips are surfaced to the
//! caller as values instead of being swallowed here, so the caller
//! decides whether to log-and-continue or bail.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use courseta_core::{CoursetaError, CoursetaResult, ErrorContext, IngestConfig, RepoFile};
use log::{debug, info, warn};
use serde::Deserialize;

/// An entry in a repository directory listing
#[derive(Debug, Clone)]
pub struct RepoEntry {
    /// Slash-separated path relative to the repository root
    pub path: String,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// Access to a repository tree
#[async_trait]
pub trait RepoApi: Send + Sync {
    /// List one directory; `""` is the repository root
    async fn list_dir(&self, path: &str) -> CoursetaResult<Vec<RepoEntry>>;

    /// Raw bytes of a file
    async fn file_content(&self, path: &str) -> CoursetaResult<Vec<u8>>;
}

/// A file the walk left out, and why
#[derive(Debug, Clone)]
pub struct Skipped {
    pub path: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub enum SkipReason {
    /// The entry could not be fetched or listed
    FetchFailed(String),
    /// The file content is not valid UTF-8
    NotUtf8,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::FetchFailed(message) => write!(f, "fetch failed: {}", message),
            SkipReason::NotUtf8 => write!(f, "content is not valid UTF-8"),
        }
    }
}

// Wire types for the GitHub contents API

#[derive(Debug, Deserialize)]
struct ContentEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct FileContent {
    content: String,
    encoding: String,
}

/// GitHub API client scoped to a single repository
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
    owner: String,
    repo: String,
}

impl GitHubClient {
    /// Create a client for the configured course repository.
    ///
    /// The access token is required up front, matching the forum
    /// credential policy: missing configuration is fatal, not retried.
    pub fn new(config: &IngestConfig) -> CoursetaResult<Self> {
        let token = config.github_token.as_deref().ok_or_else(|| CoursetaError::Config {
            message: "GITHUB_TOKEN is not set".to_string(),
            source: None,
            context: ErrorContext::new("github_client")
                .with_operation("new")
                .with_suggestion("Create a token with repo read access and export GITHUB_TOKEN"),
        })?;
        let (owner, repo) = config.repo_parts()?;

        let mut headers = reqwest::header::HeaderMap::new();
        let mut auth_value = reqwest::header::HeaderValue::from_str(&format!("token {}", token))
            .map_err(|e| CoursetaError::Config {
                message: format!("GitHub token contains invalid header characters: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("github_client").with_operation("new"),
            })?;
        auth_value.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth_value);
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("courseta/0.1"),
        );

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .build()
            .map_err(|e| CoursetaError::Config {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("github_client").with_operation("new"),
            })?;

        info!("Created GitHub client for {}/{}", owner, repo);

        Ok(Self {
            client,
            base_url: config.github_api_url.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.base_url, self.owner, self.repo, path
        )
    }

    async fn get_contents(&self, path: &str) -> CoursetaResult<reqwest::Response> {
        let url = self.contents_url(path);
        debug!("GitHub contents request: {}", url);

        let response =
            self.client.get(&url).send().await.map_err(|e| CoursetaError::SourceFetch {
                message: format!("GitHub request for '{}' failed: {}", path, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("github_client").with_operation("get_contents"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoursetaError::SourceFetch {
                message: format!("GitHub returned HTTP {} for '{}': {}", status, path, body),
                source: None,
                context: ErrorContext::new("github_client").with_operation("get_contents"),
            });
        }

        Ok(response)
    }

    /// Decode base64 content as delivered by the contents API
    fn decode_base64_content(&self, path: &str, content: &str) -> CoursetaResult<Vec<u8>> {
        // the API wraps base64 payloads with newlines
        let cleaned = content.replace(['\n', '\r', ' '], "");

        BASE64.decode(&cleaned).map_err(|e| CoursetaError::SourceFetch {
            message: format!("Failed to decode base64 content of '{}': {}", path, e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("github_client").with_operation("decode_base64_content"),
        })
    }
}

#[async_trait]
impl RepoApi for GitHubClient {
    async fn list_dir(&self, path: &str) -> CoursetaResult<Vec<RepoEntry>> {
        let response = self.get_contents(path).await?;

        let entries: Vec<ContentEntry> =
            response.json().await.map_err(|e| CoursetaError::SourceFetch {
                message: format!("Failed to parse directory listing for '{}': {}", path, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("github_client").with_operation("list_dir"),
            })?;

        Ok(entries
            .into_iter()
            .map(|entry| RepoEntry {
                kind: if entry.kind == "dir" {
                    EntryKind::Dir
                } else {
                    EntryKind::File
                },
                path: entry.path,
            })
            .collect())
    }

    async fn file_content(&self, path: &str) -> CoursetaResult<Vec<u8>> {
        let response = self.get_contents(path).await?;

        let file: FileContent =
            response.json().await.map_err(|e| CoursetaError::SourceFetch {
                message: format!("Failed to parse file response for '{}': {}", path, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("github_client").with_operation("file_content"),
            })?;

        if file.encoding != "base64" {
            return Err(CoursetaError::SourceFetch {
                message: format!("Unexpected encoding '{}' for '{}'", file.encoding, path),
                source: None,
                context: ErrorContext::new("github_client").with_operation("file_content"),
            });
        }

        self.decode_base64_content(path, &file.content)
    }
}

/// Depth-first walk over a repository tree
pub struct RepoWalker<A> {
    api: A,
    allowed_extensions: Vec<String>,
}

impl<A: RepoApi> RepoWalker<A> {
    pub fn new(api: A, allowed_extensions: Vec<String>) -> Self {
        Self {
            api,
            allowed_extensions,
        }
    }

    fn extension_allowed(&self, path: &str) -> bool {
        path.rsplit_once('.')
            .map(|(_, ext)| self.allowed_extensions.iter().any(|allowed| allowed == ext))
            .unwrap_or(false)
    }

    /// Walk the whole tree from the root.
    ///
    /// Files outside the allowed extension set are dropped silently; a
    /// file that cannot be fetched or decoded becomes a `Skipped` value.
    /// Only a failure to list the root fails the walk itself.
    pub async fn walk(&self) -> CoursetaResult<Vec<Result<RepoFile, Skipped>>> {
        let mut root = self.api.list_dir("").await?;
        root.reverse();

        let mut stack = root;
        let mut collected = Vec::new();

        while let Some(entry) = stack.pop() {
            match entry.kind {
                EntryKind::Dir => match self.api.list_dir(&entry.path).await {
                    Ok(mut entries) => {
                        // reverse so the stack pops in listing order
                        entries.reverse();
                        stack.append(&mut entries);
                    }
                    Err(e) => {
                        collected.push(Err(Skipped {
                            path: entry.path,
                            reason: SkipReason::FetchFailed(e.to_string()),
                        }));
                    }
                },
                EntryKind::File => {
                    if !self.extension_allowed(&entry.path) {
                        continue;
                    }
                    match self.api.file_content(&entry.path).await {
                        Ok(bytes) => match String::from_utf8(bytes) {
                            Ok(content) => collected.push(Ok(RepoFile {
                                path: entry.path,
                                content,
                            })),
                            Err(_) => collected.push(Err(Skipped {
                                path: entry.path,
                                reason: SkipReason::NotUtf8,
                            })),
                        },
                        Err(e) => collected.push(Err(Skipped {
                            path: entry.path,
                            reason: SkipReason::FetchFailed(e.to_string()),
                        })),
                    }
                }
            }
        }

        let kept = collected.iter().filter(|r| r.is_ok()).count();
        let skipped = collected.len() - kept;
        if skipped > 0 {
            warn!("Repository walk kept {} files, skipped {}", kept, skipped);
        } else {
            info!("Repository walk kept {} files", kept);
        }

        Ok(collected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory repository tree
    struct FakeRepo {
        dirs: HashMap<String, Vec<RepoEntry>>,
        files: HashMap<String, Vec<u8>>,
        failing_paths: Vec<String>,
    }

    impl FakeRepo {
        fn new() -> Self {
            Self {
                dirs: HashMap::new(),
                files: HashMap::new(),
                failing_paths: Vec::new(),
            }
        }

        fn dir(mut self, path: &str, entries: Vec<(&str, EntryKind)>) -> Self {
            self.dirs.insert(
                path.to_string(),
                entries
                    .into_iter()
                    .map(|(p, kind)| RepoEntry {
                        path: p.to_string(),
                        kind,
                    })
                    .collect(),
            );
            self
        }

        fn file(mut self, path: &str, bytes: &[u8]) -> Self {
            self.files.insert(path.to_string(), bytes.to_vec());
            self
        }

        fn failing(mut self, path: &str) -> Self {
            self.failing_paths.push(path.to_string());
            self
        }
    }

    fn fetch_error(path: &str) -> CoursetaError {
        CoursetaError::SourceFetch {
            message: format!("GitHub returned HTTP 502 for '{}'", path),
            source: None,
            context: ErrorContext::new("fake_repo"),
        }
    }

    #[async_trait]
    impl RepoApi for FakeRepo {
        async fn list_dir(&self, path: &str) -> CoursetaResult<Vec<RepoEntry>> {
            if self.failing_paths.iter().any(|p| p == path) {
                return Err(fetch_error(path));
            }
            Ok(self.dirs.get(path).cloned().unwrap_or_default())
        }

        async fn file_content(&self, path: &str) -> CoursetaResult<Vec<u8>> {
            if self.failing_paths.iter().any(|p| p == path) {
                return Err(fetch_error(path));
            }
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| fetch_error(path))
        }
    }

    fn md_extensions() -> Vec<String> {
        vec!["md".to_string(), "py".to_string()]
    }

    #[tokio::test]
    async fn test_undecodable_file_is_skipped_not_fatal() {
        let repo = FakeRepo::new()
            .dir(
                "",
                vec![
                    ("README.md", EntryKind::File),
                    ("image.md", EntryKind::File),
                    ("notes.md", EntryKind::File),
                ],
            )
            .file("README.md", b"# Course")
            .file("image.md", &[0xff, 0xfe, 0x00, 0x9c]) // not UTF-8
            .file("notes.md", b"weekly notes");
        let walker = RepoWalker::new(repo, md_extensions());

        let results = walker.walk().await.unwrap();
        let files: Vec<&RepoFile> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        let skips: Vec<&Skipped> = results.iter().filter_map(|r| r.as_ref().err()).collect();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "README.md");
        assert_eq!(files[1].path, "notes.md");
        assert_eq!(skips.len(), 1);
        assert_eq!(skips[0].path, "image.md");
        assert!(matches!(skips[0].reason, SkipReason::NotUtf8));
    }

    #[tokio::test]
    async fn test_extension_filter() {
        let repo = FakeRepo::new()
            .dir(
                "",
                vec![
                    ("setup.py", EntryKind::File),
                    ("data.csv", EntryKind::File),
                    ("logo.png", EntryKind::File),
                    ("Makefile", EntryKind::File),
                ],
            )
            .file("setup.py", b"print('hi')");
        let walker = RepoWalker::new(repo, md_extensions());

        let results = walker.walk().await.unwrap();

        // filtered-out files are dropped silently, not reported as skips
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap().path, "setup.py");
    }

    #[tokio::test]
    async fn test_recursion_is_depth_first_with_slash_paths() {
        let repo = FakeRepo::new()
            .dir(
                "",
                vec![("week1", EntryKind::Dir), ("README.md", EntryKind::File)],
            )
            .dir(
                "week1",
                vec![
                    ("week1/nested", EntryKind::Dir),
                    ("week1/intro.md", EntryKind::File),
                ],
            )
            .dir("week1/nested", vec![("week1/nested/deep.md", EntryKind::File)])
            .file("README.md", b"root")
            .file("week1/intro.md", b"intro")
            .file("week1/nested/deep.md", b"deep");
        let walker = RepoWalker::new(repo, md_extensions());

        let results = walker.walk().await.unwrap();
        let paths: Vec<String> = results
            .into_iter()
            .map(|r| r.unwrap().path)
            .collect();

        // week1 subtree is fully expanded before the root's later entries
        assert_eq!(
            paths,
            vec!["week1/nested/deep.md", "week1/intro.md", "README.md"]
        );
    }

    #[tokio::test]
    async fn test_unlistable_directory_is_skipped() {
        let repo = FakeRepo::new()
            .dir(
                "",
                vec![("secret", EntryKind::Dir), ("README.md", EntryKind::File)],
            )
            .file("README.md", b"root")
            .failing("secret");
        let walker = RepoWalker::new(repo, md_extensions());

        let results = walker.walk().await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(matches!(
            results[0],
            Err(Skipped {
                reason: SkipReason::FetchFailed(_),
                ..
            })
        ));
        assert_eq!(results[1].as_ref().unwrap().path, "README.md");
    }

    #[tokio::test]
    async fn test_unlistable_root_fails_the_walk() {
        let repo = FakeRepo::new().failing("");
        let walker = RepoWalker::new(repo, md_extensions());

        assert!(walker.walk().await.is_err());
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let config = IngestConfig::default(); // no GITHUB_TOKEN applied
        let result = GitHubClient::new(&config);
        assert!(matches!(result, Err(CoursetaError::Config { .. })));
    }
}
