use super::{GroupPost, Store};
use crate::models::{Article, Crosspost, Newsgroup, StoredArticle, Visibility};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{
    Row, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
};
use std::str::FromStr;

const ARTICLES_TABLE: &str = "CREATE TABLE IF NOT EXISTS articles (
        message_id TEXT PRIMARY KEY,
        raw_headers TEXT NOT NULL,
        headers TEXT NOT NULL,
        body TEXT NOT NULL
    )";

const NEWSGROUPS_TABLE: &str = "CREATE TABLE IF NOT EXISTS newsgroups (
        name TEXT PRIMARY KEY,
        description TEXT NOT NULL DEFAULT '',
        creator TEXT NOT NULL DEFAULT '',
        created_at INTEGER NOT NULL,
        moderated INTEGER NOT NULL DEFAULT 0,
        deny_local_posting INTEGER NOT NULL DEFAULT 0,
        deny_peer_posting INTEGER NOT NULL DEFAULT 0,
        post_count INTEGER NOT NULL DEFAULT 0,
        low_watermark INTEGER NOT NULL DEFAULT 0,
        high_watermark INTEGER NOT NULL DEFAULT 0
    )";

const LINKS_TABLE: &str = "CREATE TABLE IF NOT EXISTS article_newsgroups (
        group_name TEXT NOT NULL,
        number INTEGER NOT NULL,
        message_id TEXT NOT NULL REFERENCES articles(message_id),
        cancelled INTEGER NOT NULL DEFAULT 0,
        pending INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY(group_name, number)
    )";

const LINKS_MESSAGE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_links_message ON article_newsgroups(message_id)";

const LINKS_VISIBILITY_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_links_visibility \
     ON article_newsgroups(group_name, cancelled, pending, number)";

/// SQL predicate for a visibility filter, applied at query construction.
fn visibility_clause(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::Visible => "l.cancelled = 0 AND l.pending = 0",
        Visibility::Cancelled => "l.cancelled = 1",
        Visibility::Pending => "l.pending = 1",
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite storage backend, initialising the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection or schema creation fails.
    #[tracing::instrument(skip_all)]
    pub async fn new(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(path)?.create_if_missing(true);
        // a pooled :memory: database would be one private database per
        // connection
        let max_connections = if path.contains(":memory:") { 1 } else { 16 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        for schema in [
            ARTICLES_TABLE,
            NEWSGROUPS_TABLE,
            LINKS_TABLE,
            LINKS_MESSAGE_INDEX,
            LINKS_VISIBILITY_INDEX,
        ] {
            sqlx::query(schema).execute(&pool).await?;
        }

        Ok(Self { pool })
    }

    fn article_from_row(row: &SqliteRow) -> Result<Article> {
        let message_id: String = row.try_get("message_id")?;
        let raw_headers: String = row.try_get("raw_headers")?;
        let headers_json: String = row.try_get("headers")?;
        let body: String = row.try_get("body")?;
        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
        Ok(Article {
            message_id,
            headers,
            raw_headers,
            body,
        })
    }

    fn link_from_row(row: &SqliteRow) -> Result<Crosspost> {
        Ok(Crosspost {
            message_id: row.try_get("message_id")?,
            group_name: row.try_get("group_name")?,
            number: u64::try_from(row.try_get::<i64, _>("number")?).unwrap_or(0),
            cancelled: row.try_get::<i64, _>("cancelled")? != 0,
            pending: row.try_get::<i64, _>("pending")? != 0,
        })
    }

    fn stored_from_row(row: &SqliteRow) -> Result<StoredArticle> {
        Ok(StoredArticle {
            article: Self::article_from_row(row)?,
            link: Self::link_from_row(row)?,
        })
    }

    fn group_from_row(row: &SqliteRow) -> Result<Newsgroup> {
        let created_ts: i64 = row.try_get("created_at")?;
        let created_at: DateTime<Utc> = Utc
            .timestamp_opt(created_ts, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Ok(Newsgroup {
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            creator: row.try_get("creator")?,
            created_at,
            moderated: row.try_get::<i64, _>("moderated")? != 0,
            deny_local_posting: row.try_get::<i64, _>("deny_local_posting")? != 0,
            deny_peer_posting: row.try_get::<i64, _>("deny_peer_posting")? != 0,
            post_count: u64::try_from(row.try_get::<i64, _>("post_count")?).unwrap_or(0),
            low_watermark: u64::try_from(row.try_get::<i64, _>("low_watermark")?).unwrap_or(0),
            high_watermark: u64::try_from(row.try_get::<i64, _>("high_watermark")?).unwrap_or(0),
        })
    }

    /// Recompute a group's cached counters from its visible links.
    async fn reconcile_group<'e, E>(executor: E, group: &str) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query(
            "UPDATE newsgroups SET
                post_count = (SELECT COUNT(*) FROM article_newsgroups l
                              WHERE l.group_name = newsgroups.name
                                AND l.cancelled = 0 AND l.pending = 0),
                low_watermark = COALESCE((SELECT MIN(number) FROM article_newsgroups l
                              WHERE l.group_name = newsgroups.name
                                AND l.cancelled = 0 AND l.pending = 0), 0),
                high_watermark = COALESCE((SELECT MAX(number) FROM article_newsgroups l
                              WHERE l.group_name = newsgroups.name
                                AND l.cancelled = 0 AND l.pending = 0), 0)
             WHERE name = ?",
        )
        .bind(group)
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    #[tracing::instrument(skip_all)]
    async fn create_group(&self, group: &Newsgroup) -> Result<()> {
        sqlx::query(
            "INSERT INTO newsgroups
                 (name, description, creator, created_at, moderated,
                  deny_local_posting, deny_peer_posting)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&group.name)
        .bind(&group.description)
        .bind(&group.creator)
        .bind(group.created_at.timestamp())
        .bind(i64::from(group.moderated))
        .bind(i64::from(group.deny_local_posting))
        .bind(i64::from(group.deny_peer_posting))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn remove_group(&self, name: &str) -> Result<()> {
        sqlx::query("DELETE FROM newsgroups WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_group_moderated(&self, name: &str, moderated: bool) -> Result<()> {
        sqlx::query("UPDATE newsgroups SET moderated = ? WHERE name = ?")
            .bind(i64::from(moderated))
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn get_newsgroup(&self, name: &str) -> Result<Option<Newsgroup>> {
        let row = sqlx::query("SELECT * FROM newsgroups WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::group_from_row).transpose()
    }

    #[tracing::instrument(skip_all)]
    async fn list_newsgroups(
        &self,
        pattern: Option<&str>,
        created_since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Newsgroup>> {
        let rows = match created_since {
            Some(since) => {
                sqlx::query("SELECT * FROM newsgroups WHERE created_at >= ? ORDER BY name")
                    .bind(since.timestamp())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT * FROM newsgroups ORDER BY name")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        let mut groups = Vec::with_capacity(rows.len());
        for row in &rows {
            let group = Self::group_from_row(row)?;
            if let Some(pat) = pattern
                && !crate::wildmat::wildmat(pat, &group.name)
            {
                continue;
            }
            groups.push(group);
        }
        Ok(groups)
    }

    #[tracing::instrument(skip_all)]
    async fn get_article_by_message_id(&self, message_id: &str) -> Result<Option<StoredArticle>> {
        let row = sqlx::query(
            "SELECT a.message_id, a.raw_headers, a.headers, a.body,
                    l.group_name, l.number, l.cancelled, l.pending
             FROM articles a JOIN article_newsgroups l ON a.message_id = l.message_id
             WHERE a.message_id = ? AND l.cancelled = 0 AND l.pending = 0
             ORDER BY l.group_name LIMIT 1",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::stored_from_row).transpose()
    }

    async fn get_article(&self, message_id: &str) -> Result<Option<Article>> {
        let row = sqlx::query(
            "SELECT message_id, raw_headers, headers, body FROM articles WHERE message_id = ?",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::article_from_row).transpose()
    }

    async fn find_link(&self, message_id: &str, group: &str) -> Result<Option<Crosspost>> {
        let row = sqlx::query(
            "SELECT group_name, number, message_id, cancelled, pending
             FROM article_newsgroups WHERE message_id = ? AND group_name = ?",
        )
        .bind(message_id)
        .bind(group)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::link_from_row).transpose()
    }

    #[tracing::instrument(skip_all)]
    async fn get_article_by_number(
        &self,
        group: &str,
        number: u64,
        visibility: Visibility,
    ) -> Result<Option<StoredArticle>> {
        let sql = format!(
            "SELECT a.message_id, a.raw_headers, a.headers, a.body,
                    l.group_name, l.number, l.cancelled, l.pending
             FROM articles a JOIN article_newsgroups l ON a.message_id = l.message_id
             WHERE l.group_name = ? AND l.number = ? AND {}",
            visibility_clause(visibility)
        );
        let row = sqlx::query(&sql)
            .bind(group)
            .bind(i64::try_from(number).unwrap_or(-1))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::stored_from_row).transpose()
    }

    #[tracing::instrument(skip_all)]
    async fn list_articles_in_range(
        &self,
        group: &str,
        lo: u64,
        hi: u64,
        max: usize,
        visibility: Visibility,
    ) -> Result<Vec<StoredArticle>> {
        if hi < lo {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT a.message_id, a.raw_headers, a.headers, a.body,
                    l.group_name, l.number, l.cancelled, l.pending
             FROM articles a JOIN article_newsgroups l ON a.message_id = l.message_id
             WHERE l.group_name = ? AND l.number >= ? AND l.number <= ? AND {}
             ORDER BY l.number ASC LIMIT ?",
            visibility_clause(visibility)
        );
        let rows = sqlx::query(&sql)
            .bind(group)
            .bind(i64::try_from(lo).unwrap_or(0))
            .bind(i64::try_from(hi).unwrap_or(i64::MAX))
            .bind(i64::try_from(max).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::stored_from_row).collect()
    }

    async fn next_article(
        &self,
        group: &str,
        number: u64,
        visibility: Visibility,
    ) -> Result<Option<StoredArticle>> {
        let sql = format!(
            "SELECT a.message_id, a.raw_headers, a.headers, a.body,
                    l.group_name, l.number, l.cancelled, l.pending
             FROM articles a JOIN article_newsgroups l ON a.message_id = l.message_id
             WHERE l.group_name = ? AND l.number > ? AND {}
             ORDER BY l.number ASC LIMIT 1",
            visibility_clause(visibility)
        );
        let row = sqlx::query(&sql)
            .bind(group)
            .bind(i64::try_from(number).unwrap_or(0))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::stored_from_row).transpose()
    }

    async fn previous_article(
        &self,
        group: &str,
        number: u64,
        visibility: Visibility,
    ) -> Result<Option<StoredArticle>> {
        let sql = format!(
            "SELECT a.message_id, a.raw_headers, a.headers, a.body,
                    l.group_name, l.number, l.cancelled, l.pending
             FROM articles a JOIN article_newsgroups l ON a.message_id = l.message_id
             WHERE l.group_name = ? AND l.number < ? AND {}
             ORDER BY l.number DESC LIMIT 1",
            visibility_clause(visibility)
        );
        let row = sqlx::query(&sql)
            .bind(group)
            .bind(i64::try_from(number).unwrap_or(0))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::stored_from_row).transpose()
    }

    async fn group_stats(&self, group: &str, visibility: Visibility) -> Result<(u64, u64, u64)> {
        let sql = format!(
            "SELECT COUNT(*) AS c, COALESCE(MIN(number), 0) AS lo, COALESCE(MAX(number), 0) AS hi
             FROM article_newsgroups l WHERE l.group_name = ? AND {}",
            visibility_clause(visibility)
        );
        let row = sqlx::query(&sql).bind(group).fetch_one(&self.pool).await?;
        Ok((
            u64::try_from(row.try_get::<i64, _>("c")?).unwrap_or(0),
            u64::try_from(row.try_get::<i64, _>("lo")?).unwrap_or(0),
            u64::try_from(row.try_get::<i64, _>("hi")?).unwrap_or(0),
        ))
    }

    #[tracing::instrument(skip_all)]
    async fn insert_article(
        &self,
        article: &Article,
        posts: &[GroupPost],
    ) -> Result<Vec<Crosspost>> {
        let headers_json = serde_json::to_string(&article.headers)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT OR IGNORE INTO articles (message_id, raw_headers, headers, body)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&article.message_id)
        .bind(&article.raw_headers)
        .bind(&headers_json)
        .bind(&article.body)
        .execute(&mut *tx)
        .await?;

        let mut links = Vec::with_capacity(posts.len());
        for post in posts {
            let number: i64 = sqlx::query_scalar(
                "SELECT COALESCE(MAX(number), 0) + 1 FROM article_newsgroups WHERE group_name = ?",
            )
            .bind(&post.group_name)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO article_newsgroups (group_name, number, message_id, cancelled, pending)
                 VALUES (?, ?, ?, 0, ?)",
            )
            .bind(&post.group_name)
            .bind(number)
            .bind(&article.message_id)
            .bind(i64::from(post.pending))
            .execute(&mut *tx)
            .await?;

            if !post.pending {
                sqlx::query(
                    "UPDATE newsgroups SET
                         post_count = post_count + 1,
                         high_watermark = ?,
                         low_watermark = CASE WHEN low_watermark = 0 THEN ? ELSE low_watermark END
                     WHERE name = ?",
                )
                .bind(number)
                .bind(number)
                .bind(&post.group_name)
                .execute(&mut *tx)
                .await?;
            }

            links.push(Crosspost {
                message_id: article.message_id.clone(),
                group_name: post.group_name.clone(),
                number: u64::try_from(number).unwrap_or(0),
                cancelled: false,
                pending: post.pending,
            });
        }

        tx.commit().await?;
        Ok(links)
    }

    #[tracing::instrument(skip_all)]
    async fn update_link(&self, link: &Crosspost) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE article_newsgroups SET cancelled = ?, pending = ?
             WHERE group_name = ? AND number = ?",
        )
        .bind(i64::from(link.cancelled))
        .bind(i64::from(link.pending))
        .bind(&link.group_name)
        .bind(i64::try_from(link.number).unwrap_or(0))
        .execute(&mut *tx)
        .await?;
        Self::reconcile_group(&mut *tx, &link.group_name).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_article_headers(&self, article: &Article) -> Result<()> {
        let headers_json = serde_json::to_string(&article.headers)?;
        sqlx::query("UPDATE articles SET raw_headers = ?, headers = ? WHERE message_id = ?")
            .bind(&article.raw_headers)
            .bind(&headers_json)
            .bind(&article.message_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
