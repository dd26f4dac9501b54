//! Shared selection logic and response plumbing for command handlers.

use crate::models::StoredArticle;
use crate::parse::{ArticleRange, parse_range};
use crate::retriever::{GroupView, Retriever};
use crate::session::Session;
use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Write a single response line and flush it.
pub async fn write_simple<W: AsyncWrite + Unpin>(writer: &mut W, response: &str) -> Result<()> {
    writer.write_all(response.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Failure modes of article selection, each mapping to one response code.
#[derive(Debug)]
pub enum ArticleQueryError {
    /// 412: numeric selection without a current group.
    NoGroup,
    /// 501: argument is neither a message-id nor a number/range.
    InvalidId,
    /// 501: malformed range shape.
    RangeSyntax,
    /// 423: range resolves to nothing.
    RangeEmpty,
    /// 423: no article with that number.
    NotFoundByNumber,
    /// 430: no article with that message-id.
    MessageIdNotFound,
    /// 420: no current article to operate on.
    NoCurrentArticle,
    /// 403: the store failed.
    Backend(anyhow::Error),
}

/// Map a selection failure to its response line.
pub async fn handle_article_error<W: AsyncWrite + Unpin>(
    writer: &mut W,
    error: ArticleQueryError,
) -> Result<()> {
    use crate::error::{NntpError, StorageError};
    use crate::responses::*;

    let line = match error {
        ArticleQueryError::NoGroup => RESP_412_NO_GROUP,
        ArticleQueryError::InvalidId => RESP_501_INVALID_ARG,
        ArticleQueryError::RangeSyntax => RESP_501_SYNTAX,
        ArticleQueryError::RangeEmpty => RESP_423_RANGE_EMPTY,
        ArticleQueryError::NotFoundByNumber => RESP_423_NO_ARTICLE_NUM,
        ArticleQueryError::MessageIdNotFound => RESP_430_NO_ARTICLE,
        ArticleQueryError::NoCurrentArticle => RESP_420_NO_CURRENT,
        ArticleQueryError::Backend(e) => {
            let err = NntpError::Storage(StorageError::Database(e.into()));
            tracing::error!(error = %err, "article selection failed");
            return write_simple(writer, &err.to_response()).await;
        }
    };
    write_simple(writer, line).await
}

fn backend(e: anyhow::Error) -> ArticleQueryError {
    ArticleQueryError::Backend(e)
}

/// Resolve the session's current group name into a view, re-checking the
/// metagroup capability gate on every use.
pub async fn current_view(
    retriever: &Retriever,
    session: &Session,
) -> Result<Option<GroupView>, ArticleQueryError> {
    let Some(name) = session.current_group() else {
        return Ok(None);
    };
    retriever
        .group_view(name, session.identity())
        .await
        .map_err(backend)
}

/// Resolve articles for the selection argument shared by ARTICLE, HEAD,
/// BODY, STAT, HDR and OVER.
///
/// Precedence: an explicit `<msg-id>` bypasses the current group (reported
/// number 0); a numeric argument requires a current group; no argument
/// requires a current article. `allow_range` controls whether the numeric
/// form may be a range.
pub async fn resolve_articles(
    retriever: &Retriever,
    session: &mut Session,
    arg: Option<&str>,
    allow_range: bool,
    max_results: usize,
) -> Result<Vec<(u64, Arc<StoredArticle>)>, ArticleQueryError> {
    if let Some(arg) = arg {
        if arg.starts_with('<') && arg.ends_with('>') {
            let found = retriever.article_by_id(arg).await.map_err(backend)?;
            return match found {
                Some(article) => Ok(vec![(0, article)]),
                None => Err(ArticleQueryError::MessageIdNotFound),
            };
        }

        let looks_numeric = arg.chars().all(|c| c.is_ascii_digit() || c == '-');
        if !looks_numeric {
            return Err(ArticleQueryError::InvalidId);
        }
        let Some(view) = current_view(retriever, session).await? else {
            return Err(ArticleQueryError::NoGroup);
        };
        let Some(range) = parse_range(arg) else {
            return Err(ArticleQueryError::RangeSyntax);
        };

        match range {
            ArticleRange::Single(number) => {
                let found = retriever
                    .article_by_number(&view, number)
                    .await
                    .map_err(backend)?;
                match found {
                    Some(article) => {
                        session.set_current_article(number);
                        Ok(vec![(number, article)])
                    }
                    None => Err(ArticleQueryError::NotFoundByNumber),
                }
            }
            _ if !allow_range => Err(ArticleQueryError::RangeSyntax),
            _ => {
                let (_, _, high) = retriever.view_stats(&view).await.map_err(backend)?;
                let (lo, hi) = range.bounds(high);
                if hi < lo {
                    return Err(ArticleQueryError::RangeEmpty);
                }
                let entries = retriever
                    .article_range(&view, lo, hi, max_results)
                    .await
                    .map_err(backend)?;
                if entries.is_empty() {
                    return Err(ArticleQueryError::RangeEmpty);
                }
                Ok(entries
                    .into_iter()
                    .map(|e| (e.link.number, Arc::new(e)))
                    .collect())
            }
        }
    } else {
        let Some(view) = current_view(retriever, session).await? else {
            return Err(ArticleQueryError::NoGroup);
        };
        let Some(current) = session.current_article() else {
            return Err(ArticleQueryError::NoCurrentArticle);
        };
        let found = retriever
            .article_by_number(&view, current)
            .await
            .map_err(backend)?;
        match found {
            Some(article) => Ok(vec![(current, article)]),
            None => Err(ArticleQueryError::NoCurrentArticle),
        }
    }
}
