use crate::models::{Article, Crosspost, Newsgroup, StoredArticle, Visibility};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// One target group of a post, before a number has been assigned.
#[derive(Debug, Clone)]
pub struct GroupPost {
    pub group_name: String,
    pub pending: bool,
}

/// Abstract interface over article and newsgroup persistence.
///
/// Visibility filters are part of every read so the store can push them
/// into the query instead of post-filtering rows.
#[async_trait]
pub trait Store: Send + Sync {
    /// Create a newsgroup. Fails if the name is already taken.
    async fn create_group(&self, group: &Newsgroup) -> Result<()>;

    /// Remove a newsgroup row. Crosspost links are left behind and become
    /// unreachable through group-scoped reads.
    async fn remove_group(&self, name: &str) -> Result<()>;

    /// Set moderation status for an existing newsgroup.
    async fn set_group_moderated(&self, name: &str, moderated: bool) -> Result<()>;

    async fn get_newsgroup(&self, name: &str) -> Result<Option<Newsgroup>>;

    /// All groups, optionally filtered by a wildmat and/or creation time.
    async fn list_newsgroups(
        &self,
        pattern: Option<&str>,
        created_since: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<Newsgroup>>;

    /// Resolve a message-id to its article and one visible crosspost link.
    async fn get_article_by_message_id(&self, message_id: &str) -> Result<Option<StoredArticle>>;

    /// Fetch an article record regardless of link visibility. Used by the
    /// moderation approval path, which operates on pending articles.
    async fn get_article(&self, message_id: &str) -> Result<Option<Article>>;

    /// The crosspost link for a message-id within one group, any state.
    async fn find_link(&self, message_id: &str, group: &str) -> Result<Option<Crosspost>>;

    async fn get_article_by_number(
        &self,
        group: &str,
        number: u64,
        visibility: Visibility,
    ) -> Result<Option<StoredArticle>>;

    /// Bulk range read, ordered by number ascending, capped at `max`.
    async fn list_articles_in_range(
        &self,
        group: &str,
        lo: u64,
        hi: u64,
        max: usize,
        visibility: Visibility,
    ) -> Result<Vec<StoredArticle>>;

    /// Closest link strictly after `number`, for NEXT.
    async fn next_article(
        &self,
        group: &str,
        number: u64,
        visibility: Visibility,
    ) -> Result<Option<StoredArticle>>;

    /// Closest link strictly before `number`, for LAST.
    async fn previous_article(
        &self,
        group: &str,
        number: u64,
        visibility: Visibility,
    ) -> Result<Option<StoredArticle>>;

    /// (count, low, high) over the links matching `visibility`.
    async fn group_stats(&self, group: &str, visibility: Visibility) -> Result<(u64, u64, u64)>;

    /// Persist an article and one link per target group atomically. Numbers
    /// are assigned max+1 inside the transaction; callers serialize posts
    /// per group. Returns the assigned links.
    async fn insert_article(&self, article: &Article, posts: &[GroupPost])
    -> Result<Vec<Crosspost>>;

    /// Rewrite a link's cancelled/pending flags and reconcile the group's
    /// cached counters.
    async fn update_link(&self, link: &Crosspost) -> Result<()>;

    /// Rewrite an article's header block, e.g. when moderation stamps
    /// an Approved header.
    async fn update_article_headers(&self, article: &Article) -> Result<()>;
}

pub type DynStore = Arc<dyn Store>;

pub mod sqlite;

/// Create a storage backend from a connection URI.
pub async fn open(uri: &str) -> Result<DynStore> {
    if uri.starts_with("sqlite:") {
        sqlite::SqliteStore::new(uri)
            .await
            .map(|s| Arc::new(s) as DynStore)
            .map_err(|e| {
                anyhow::anyhow!(
                    "Failed to open SQLite article database '{uri}': {e}

For SQLite URIs use sqlite:///path/to/news.db, or sqlite::memory: for an
in-memory database. SQLite creates the file but not missing directories."
                )
            })
    } else {
        Err(anyhow::anyhow!(
            "Unknown storage backend: '{uri}' (supported: sqlite://...)"
        ))
    }
}
