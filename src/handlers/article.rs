//! Article retrieval command handlers.

use super::utils::{handle_article_error, resolve_articles, write_simple};
use super::{CommandHandler, Conn, HandlerContext, HandlerResult};
use crate::codec::{MultilineBody, send_multiline};
use crate::models::StoredArticle;
use crate::overview;
use crate::responses::*;

/// Which parts of an article a retrieval command emits.
#[derive(Debug, Clone, Copy)]
enum ArticleOperation {
    Full,
    Headers,
    Body,
    Stat,
}

impl ArticleOperation {
    fn status_line(self, number: u64, message_id: &str) -> String {
        match self {
            ArticleOperation::Full => {
                format!("220 {number} {message_id} Article follows (multi-line)\r\n")
            }
            ArticleOperation::Headers => {
                format!("221 {number} {message_id} Headers follow (multi-line)\r\n")
            }
            ArticleOperation::Body => {
                format!("222 {number} {message_id} Body follows (multi-line)\r\n")
            }
            ArticleOperation::Stat => format!("223 {number} {message_id} Article exists\r\n"),
        }
    }
}

/// Push a verbatim CRLF block as dot-stuffed lines, dropping the trailing
/// line terminator so no empty line is appended.
fn push_block(body: &mut MultilineBody, block: &str) {
    for line in block.trim_end_matches("\r\n").split("\r\n") {
        body.push_line(line);
    }
}

async fn handle_operation<S: Conn>(
    ctx: &mut HandlerContext<S>,
    args: &[String],
    operation: ArticleOperation,
) -> HandlerResult {
    let max_results = ctx.engine.config.read().await.max_scan_results;
    let selected = resolve_articles(
        &ctx.engine.retriever,
        &mut ctx.session,
        args.first().map(String::as_str),
        false,
        max_results,
    )
    .await;

    let entries = match selected {
        Ok(entries) => entries,
        Err(error) => return handle_article_error(&mut ctx.stream, error).await,
    };

    for (number, entry) in entries {
        let status = operation.status_line(number, &entry.article.message_id);
        match operation {
            ArticleOperation::Stat => {
                write_simple(&mut ctx.stream, &status).await?;
            }
            ArticleOperation::Full => {
                let mut body = MultilineBody::new();
                push_block(&mut body, &entry.article.raw_headers);
                body.push_line("");
                push_block(&mut body, &entry.article.body);
                send_multiline(&mut ctx.stream, &status, body, ctx.session.gzip_active()).await?;
            }
            ArticleOperation::Headers => {
                let mut body = MultilineBody::new();
                push_block(&mut body, &entry.article.raw_headers);
                send_multiline(&mut ctx.stream, &status, body, ctx.session.gzip_active()).await?;
            }
            ArticleOperation::Body => {
                let mut body = MultilineBody::new();
                push_block(&mut body, &entry.article.body);
                send_multiline(&mut ctx.stream, &status, body, ctx.session.gzip_active()).await?;
            }
        }
    }
    Ok(())
}

macro_rules! article_handler {
    ($name:ident, $operation:expr) => {
        pub struct $name;

        impl CommandHandler for $name {
            async fn handle<S: Conn>(
                ctx: &mut HandlerContext<S>,
                args: &[String],
            ) -> HandlerResult {
                handle_operation(ctx, args, $operation).await
            }
        }
    };
}

article_handler!(ArticleHandler, ArticleOperation::Full);
article_handler!(HeadHandler, ArticleOperation::Headers);
article_handler!(BodyHandler, ArticleOperation::Body);
article_handler!(StatHandler, ArticleOperation::Stat);

/// Value of one overview/header field for the HDR command, including the
/// `:bytes` and `:lines` metadata pseudo-headers.
fn field_value(entry: &StoredArticle, field: &str) -> Option<String> {
    if field.eq_ignore_ascii_case(":bytes") {
        Some((entry.article.body.len() * 2).to_string())
    } else if field.eq_ignore_ascii_case(":lines") {
        Some(entry.article.body.split("\r\n").count().to_string())
    } else if field.starts_with(':') {
        None
    } else {
        entry
            .article
            .header(field)
            .map(overview::unfold)
    }
}

async fn handle_hdr<S: Conn>(
    ctx: &mut HandlerContext<S>,
    args: &[String],
    status: &str,
) -> HandlerResult {
    let Some(field) = args.first() else {
        return write_simple(&mut ctx.stream, RESP_501_NOT_ENOUGH).await;
    };

    let max_results = ctx.engine.config.read().await.max_scan_results;
    let selected = resolve_articles(
        &ctx.engine.retriever,
        &mut ctx.session,
        args.get(1).map(String::as_str),
        true,
        max_results,
    )
    .await;

    let entries = match selected {
        Ok(entries) => entries,
        Err(error) => return handle_article_error(&mut ctx.stream, error).await,
    };

    let mut body = MultilineBody::new();
    for (number, entry) in entries {
        match field_value(&entry, field) {
            Some(value) => body.push_line(&format!("{number} {value}")),
            None => body.push_line(&format!("{number}")),
        }
    }
    send_multiline(&mut ctx.stream, status, body, ctx.session.gzip_active()).await
}

/// Handler for the HDR command.
pub struct HdrHandler;

impl CommandHandler for HdrHandler {
    async fn handle<S: Conn>(ctx: &mut HandlerContext<S>, args: &[String]) -> HandlerResult {
        handle_hdr(ctx, args, RESP_225_HEADERS).await
    }
}

/// Handler for the XHDR command, which predates HDR and answers 221.
pub struct XhdrHandler;

impl CommandHandler for XhdrHandler {
    async fn handle<S: Conn>(ctx: &mut HandlerContext<S>, args: &[String]) -> HandlerResult {
        handle_hdr(ctx, args, RESP_221_HEADER_FOLLOWS).await
    }
}

/// Handler for the OVER and XOVER commands.
pub struct OverHandler;

impl CommandHandler for OverHandler {
    async fn handle<S: Conn>(ctx: &mut HandlerContext<S>, args: &[String]) -> HandlerResult {
        let max_results = ctx.engine.config.read().await.max_scan_results;
        let selected = resolve_articles(
            &ctx.engine.retriever,
            &mut ctx.session,
            args.first().map(String::as_str),
            true,
            max_results,
        )
        .await;

        let entries = match selected {
            Ok(entries) => entries,
            Err(error) => return handle_article_error(&mut ctx.stream, error).await,
        };

        let mut body = MultilineBody::new();
        for (_, entry) in &entries {
            body.push_line(&overview::overview_line(entry));
        }
        send_multiline(
            &mut ctx.stream,
            RESP_224_OVERVIEW,
            body,
            ctx.session.gzip_active(),
        )
        .await
    }
}
