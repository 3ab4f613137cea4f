//! Discourse forum client and scraper
//!
//! The HTTP surface lives behind the `ForumApi` trait so the pagination,
//! date filtering, and post flattening logic can be exercised against an
//! in-memory forum in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courseta_core::{CoursetaError, CoursetaResult, ErrorContext, ForumPost, IngestConfig};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// How many topic threads are fetched concurrently
const TOPIC_FETCH_CONCURRENCY: usize = 8;

/// A topic as listed on a category page
#[derive(Debug, Clone, Deserialize)]
pub struct TopicSummary {
    pub id: u64,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Access to a Discourse forum
#[async_trait]
pub trait ForumApi: Send + Sync {
    /// Verify the session and return the authenticated username
    async fn current_session(&self) -> CoursetaResult<String>;

    /// One page of the category listing, 1-based. An empty page is the
    /// normal end-of-pagination signal.
    async fn topic_page(&self, page: u32) -> CoursetaResult<Vec<TopicSummary>>;

    /// The full post thread of a topic, flattened to `ForumPost`s
    async fn topic_posts(&self, topic: &TopicSummary) -> CoursetaResult<Vec<ForumPost>>;
}

// Wire types for the Discourse JSON API

#[derive(Debug, Deserialize)]
struct CategoryPage {
    #[serde(default)]
    topic_list: TopicList,
}

#[derive(Debug, Default, Deserialize)]
struct TopicList {
    #[serde(default)]
    topics: Vec<TopicSummary>,
}

#[derive(Debug, Deserialize)]
struct TopicThread {
    #[serde(default)]
    post_stream: PostStream,
}

#[derive(Debug, Default, Deserialize)]
struct PostStream {
    #[serde(default)]
    posts: Vec<RawPost>,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    id: u64,
    cooked: String,
    created_at: DateTime<Utc>,
    post_number: u32,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    current_user: CurrentUser,
}

#[derive(Debug, Deserialize)]
struct CurrentUser {
    username: String,
}

/// Authenticated HTTP client for a Discourse forum
pub struct DiscourseClient {
    client: reqwest::Client,
    base_url: String,
    category_path: String,
}

impl DiscourseClient {
    /// Build a client bound to pre-supplied session cookies.
    ///
    /// Both the `_t` and `_forum_session` cookies are required; a missing
    /// one is a fatal precondition, not something to retry.
    pub fn new(config: &IngestConfig) -> CoursetaResult<Self> {
        let t_cookie = config.discourse_t_cookie.as_deref().ok_or_else(|| {
            missing_cookie_error("DISCOURSE_T_COOKIE")
        })?;
        let session_cookie = config.discourse_session_cookie.as_deref().ok_or_else(|| {
            missing_cookie_error("DISCOURSE_SESSION_COOKIE")
        })?;

        let cookie_header = format!("_t={}; _forum_session={}", t_cookie, session_cookie);
        let mut headers = reqwest::header::HeaderMap::new();
        let mut cookie_value = reqwest::header::HeaderValue::from_str(&cookie_header)
            .map_err(|e| CoursetaError::Config {
                message: format!("Session cookies contain invalid header characters: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("discourse_client").with_operation("new"),
            })?;
        cookie_value.set_sensitive(true);
        headers.insert(reqwest::header::COOKIE, cookie_value);

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .build()
            .map_err(|e| CoursetaError::Config {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("discourse_client").with_operation("new"),
            })?;

        info!("Created Discourse client for {}", config.discourse_base_url);

        Ok(Self {
            client,
            base_url: config.discourse_base_url.trim_end_matches('/').to_string(),
            category_path: config.category_path.trim_matches('/').to_string(),
        })
    }
}

fn missing_cookie_error(var: &str) -> CoursetaError {
    CoursetaError::Config {
        message: format!("Missing Discourse session cookie: {}", var),
        source: None,
        context: ErrorContext::new("discourse_client")
            .with_operation("new")
            .with_suggestion("Copy the cookie value from a logged-in browser session")
            .with_suggestion(&format!("Set the {} environment variable", var)),
    }
}

#[async_trait]
impl ForumApi for DiscourseClient {
    async fn current_session(&self) -> CoursetaResult<String> {
        let url = format!("{}/session/current.json", self.base_url);
        debug!("Verifying Discourse session at {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            CoursetaError::SourceFetch {
                message: format!("Session verification request failed: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("discourse_client").with_operation("current_session"),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoursetaError::Authentication {
                message: "Discourse rejected the session cookies".to_string(),
                status: status.as_u16(),
                body,
                context: ErrorContext::new("discourse_client")
                    .with_operation("current_session")
                    .with_suggestion("Session cookies expire; refresh them from the browser"),
            });
        }

        let session: SessionResponse =
            response.json().await.map_err(|e| CoursetaError::SourceFetch {
                message: format!("Failed to parse session response: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("discourse_client").with_operation("current_session"),
            })?;

        Ok(session.current_user.username)
    }

    async fn topic_page(&self, page: u32) -> CoursetaResult<Vec<TopicSummary>> {
        let url = format!("{}/{}.json?page={}", self.base_url, self.category_path, page);
        debug!("Fetching category page {}", page);

        let response =
            self.client.get(&url).send().await.map_err(|e| CoursetaError::SourceFetch {
                message: format!("Failed to fetch topics page {}: {}", page, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("discourse_client").with_operation("topic_page"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoursetaError::SourceFetch {
                message: format!("Topics page {} returned HTTP {}: {}", page, status, body),
                source: None,
                context: ErrorContext::new("discourse_client").with_operation("topic_page"),
            });
        }

        let listing: CategoryPage =
            response.json().await.map_err(|e| CoursetaError::SourceFetch {
                message: format!("Failed to parse topics page {}: {}", page, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("discourse_client").with_operation("topic_page"),
            })?;

        Ok(listing.topic_list.topics)
    }

    async fn topic_posts(&self, topic: &TopicSummary) -> CoursetaResult<Vec<ForumPost>> {
        let url = format!("{}/t/{}.json", self.base_url, topic.id);
        debug!("Fetching posts for topic {} ({})", topic.id, topic.title);

        let response =
            self.client.get(&url).send().await.map_err(|e| CoursetaError::SourceFetch {
                message: format!("Failed to fetch topic {}: {}", topic.id, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("discourse_client").with_operation("topic_posts"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoursetaError::SourceFetch {
                message: format!("Topic {} returned HTTP {}: {}", topic.id, status, body),
                source: None,
                context: ErrorContext::new("discourse_client").with_operation("topic_posts"),
            });
        }

        let thread: TopicThread =
            response.json().await.map_err(|e| CoursetaError::SourceFetch {
                message: format!("Failed to parse topic {}: {}", topic.id, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("discourse_client").with_operation("topic_posts"),
            })?;

        let posts = thread
            .post_stream
            .posts
            .into_iter()
            .map(|post| ForumPost {
                topic_id: topic.id,
                title: topic.title.clone(),
                post_id: post.id,
                content: post.cooked,
                created_at: post.created_at,
                url: format!("{}/t/{}/{}", self.base_url, topic.id, post.post_number),
            })
            .collect();

        Ok(posts)
    }
}

/// Walks a forum category page-by-page and flattens kept topics to posts
pub struct ForumScraper<A> {
    api: A,
    max_pages: u32,
}

impl<A: ForumApi> ForumScraper<A> {
    pub fn new(api: A, max_pages: u32) -> Self {
        Self { api, max_pages }
    }

    /// All topics whose creation time falls within `[start, end]`.
    ///
    /// Pagination stops at the first empty page. A failed page stops
    /// pagination too, keeping whatever was collected so far; the listing
    /// is not assumed to be date-sorted, so out-of-range topics never end
    /// the walk early.
    pub async fn fetch_topics(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoursetaResult<Vec<TopicSummary>> {
        let mut kept = Vec::new();
        let mut page = 1u32;

        loop {
            if page > self.max_pages {
                warn!(
                    "Stopping pagination at the {}-page safety limit",
                    self.max_pages
                );
                break;
            }

            match self.api.topic_page(page).await {
                Ok(topics) if topics.is_empty() => {
                    debug!("Page {} is empty, end of pagination", page);
                    break;
                }
                Ok(topics) => {
                    let total = topics.len();
                    kept.extend(
                        topics
                            .into_iter()
                            .filter(|t| t.created_at >= start && t.created_at <= end),
                    );
                    debug!("Page {}: {} topics listed, {} kept so far", page, total, kept.len());
                }
                Err(e) => {
                    // Partial results are acceptable; a bad page is not fatal
                    warn!("Failed to fetch topics page {}: {}", page, e);
                    break;
                }
            }

            page += 1;
        }

        Ok(kept)
    }

    /// Verify the session, then collect every post of every topic in the
    /// date range. A topic whose thread fetch fails contributes nothing.
    pub async fn scrape(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoursetaResult<Vec<ForumPost>> {
        let username = self.api.current_session().await?;
        info!("Authenticated with Discourse as {}", username);

        let topics = self.fetch_topics(start, end).await?;
        info!("Found {} topics in the date range", topics.len());

        let api = &self.api;
        let results: Vec<(TopicSummary, CoursetaResult<Vec<ForumPost>>)> = stream::iter(topics)
            .map(|topic| async move {
                let posts = api.topic_posts(&topic).await;
                (topic, posts)
            })
            .buffered(TOPIC_FETCH_CONCURRENCY)
            .collect()
            .await;

        let mut posts = Vec::new();
        for (topic, result) in results {
            match result {
                Ok(mut topic_posts) => posts.append(&mut topic_posts),
                Err(e) => warn!("Failed to fetch topic {} ({}): {}", topic.id, topic.title, e),
            }
        }

        info!("Collected {} forum posts", posts.len());
        Ok(posts)
    }
}
