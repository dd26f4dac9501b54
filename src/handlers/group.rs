//! Group selection, listing and navigation command handlers.

use super::utils::{current_view, handle_article_error, write_simple};
use super::{CommandHandler, Conn, HandlerContext, HandlerResult};
use crate::codec::{MultilineBody, send_multiline};
use crate::parse::{ArticleRange, parse_datetime, parse_range};
use crate::responses::*;
use crate::retriever::GroupView;

/// Handler for the GROUP command.
pub struct GroupHandler;

impl CommandHandler for GroupHandler {
    async fn handle<S: Conn>(ctx: &mut HandlerContext<S>, args: &[String]) -> HandlerResult {
        let Some(name) = args.first() else {
            return write_simple(&mut ctx.stream, RESP_501_NOT_ENOUGH).await;
        };

        let Some(view) = ctx
            .engine
            .retriever
            .group_view(name, ctx.session.identity())
            .await?
        else {
            return write_simple(&mut ctx.stream, RESP_411_NO_SUCH_GROUP).await;
        };
        let (count, low, high) = ctx.engine.retriever.view_stats(&view).await?;

        // The cursor lands on the low watermark even when that article has
        // since been cancelled; a following ARTICLE may answer 420.
        let cursor = (count > 0).then_some(low);
        ctx.session.select_group(view.requested_name.clone(), cursor);

        write_simple(
            &mut ctx.stream,
            &format!("211 {count} {low} {high} {}\r\n", view.requested_name),
        )
        .await
    }
}

/// Handler for the LISTGROUP command.
pub struct ListGroupHandler;

impl CommandHandler for ListGroupHandler {
    async fn handle<S: Conn>(ctx: &mut HandlerContext<S>, args: &[String]) -> HandlerResult {
        let view = if let Some(name) = args.first() {
            match ctx
                .engine
                .retriever
                .group_view(name, ctx.session.identity())
                .await?
            {
                Some(view) => view,
                None => return write_simple(&mut ctx.stream, RESP_411_NO_SUCH_GROUP).await,
            }
        } else {
            match current_view(&ctx.engine.retriever, &ctx.session).await {
                Ok(Some(view)) => view,
                Ok(None) => return write_simple(&mut ctx.stream, RESP_412_NO_GROUP).await,
                Err(error) => return handle_article_error(&mut ctx.stream, error).await,
            }
        };

        let (count, low, high) = ctx.engine.retriever.view_stats(&view).await?;
        let (lo, hi) = match args.get(1) {
            Some(spec) => {
                let Some(range) = parse_range(spec) else {
                    return write_simple(&mut ctx.stream, RESP_501_SYNTAX).await;
                };
                range.bounds(high)
            }
            None => ArticleRange::From(low).bounds(high),
        };

        let max_results = ctx.engine.config.read().await.max_scan_results;
        let entries = ctx
            .engine
            .retriever
            .article_range(&view, lo, hi, max_results)
            .await?;

        let cursor = (count > 0).then_some(low);
        ctx.session.select_group(view.requested_name.clone(), cursor);

        let mut body = MultilineBody::new();
        for entry in &entries {
            body.push_line(&entry.link.number.to_string());
        }
        let status = format!(
            "211 {count} {low} {high} {} list follows\r\n",
            view.requested_name
        );
        send_multiline(&mut ctx.stream, &status, body, ctx.session.gzip_active()).await
    }
}

/// Handler for the LIST command and its keywords.
pub struct ListHandler;

impl CommandHandler for ListHandler {
    async fn handle<S: Conn>(ctx: &mut HandlerContext<S>, args: &[String]) -> HandlerResult {
        match args.first().map(|s| s.to_ascii_uppercase()).as_deref() {
            None | Some("ACTIVE") => list_active(ctx, args.get(1)).await,
            Some("NEWSGROUPS") => list_newsgroups(ctx).await,
            Some("ACTIVE.TIMES") => list_active_times(ctx, args.get(1)).await,
            Some("OVERVIEW.FMT") => list_overview_fmt(ctx).await,
            _ => write_simple(&mut ctx.stream, RESP_501_UNKNOWN_KEYWORD).await,
        }
    }
}

async fn list_active<S: Conn>(
    ctx: &mut HandlerContext<S>,
    pattern: Option<&String>,
) -> HandlerResult {
    let groups = ctx
        .engine
        .store
        .list_newsgroups(pattern.map(String::as_str), None)
        .await?;
    let posting = ctx.session.can_post();

    let mut body = MultilineBody::new();
    for group in &groups {
        body.push_line(&format!(
            "{} {} {} {}",
            group.name,
            group.high_watermark,
            group.low_watermark,
            group.list_flag(posting)
        ));
    }
    send_multiline(
        &mut ctx.stream,
        RESP_215_LIST_FOLLOWS,
        body,
        ctx.session.gzip_active(),
    )
    .await
}

async fn list_newsgroups<S: Conn>(ctx: &mut HandlerContext<S>) -> HandlerResult {
    let groups = ctx.engine.store.list_newsgroups(None, None).await?;
    let mut body = MultilineBody::new();
    for group in &groups {
        body.push_line(&format!("{}\t{}", group.name, group.description));
    }
    send_multiline(
        &mut ctx.stream,
        RESP_215_DESCRIPTIONS,
        body,
        ctx.session.gzip_active(),
    )
    .await
}

async fn list_active_times<S: Conn>(
    ctx: &mut HandlerContext<S>,
    pattern: Option<&String>,
) -> HandlerResult {
    let groups = ctx
        .engine
        .store
        .list_newsgroups(pattern.map(String::as_str), None)
        .await?;
    let mut body = MultilineBody::new();
    for group in &groups {
        body.push_line(&format!(
            "{} {} {}",
            group.name,
            group.created_at.timestamp(),
            group.creator
        ));
    }
    send_multiline(
        &mut ctx.stream,
        RESP_215_ACTIVE_TIMES,
        body,
        ctx.session.gzip_active(),
    )
    .await
}

async fn list_overview_fmt<S: Conn>(ctx: &mut HandlerContext<S>) -> HandlerResult {
    let mut body = MultilineBody::new();
    for field in OVERVIEW_FMT_FIELDS {
        body.push_line(field);
    }
    send_multiline(
        &mut ctx.stream,
        RESP_215_OVERVIEW_FMT,
        body,
        ctx.session.gzip_active(),
    )
    .await
}

/// Handler for the NEWGROUPS command.
pub struct NewGroupsHandler;

impl CommandHandler for NewGroupsHandler {
    async fn handle<S: Conn>(ctx: &mut HandlerContext<S>, args: &[String]) -> HandlerResult {
        if args.len() < 2 {
            return write_simple(&mut ctx.stream, RESP_501_NOT_ENOUGH).await;
        }
        let gmt = match args.get(2) {
            Some(arg) => {
                if !arg.eq_ignore_ascii_case("GMT") {
                    return write_simple(&mut ctx.stream, RESP_501_INVALID_ARG).await;
                }
                true
            }
            None => false,
        };
        let Ok(since) = parse_datetime(&args[0], &args[1], gmt) else {
            return write_simple(&mut ctx.stream, RESP_501_INVALID_DATE).await;
        };

        let groups = ctx.engine.store.list_newsgroups(None, Some(since)).await?;
        let posting = ctx.session.can_post();

        let mut body = MultilineBody::new();
        for group in &groups {
            body.push_line(&format!(
                "{} {} {} {}",
                group.name,
                group.high_watermark,
                group.low_watermark,
                group.list_flag(posting)
            ));
        }
        send_multiline(
            &mut ctx.stream,
            RESP_231_NEWGROUPS,
            body,
            ctx.session.gzip_active(),
        )
        .await
    }
}

enum Direction {
    Next,
    Previous,
}

async fn navigate<S: Conn>(ctx: &mut HandlerContext<S>, direction: Direction) -> HandlerResult {
    let view: GroupView = match current_view(&ctx.engine.retriever, &ctx.session).await {
        Ok(Some(view)) => view,
        Ok(None) => return write_simple(&mut ctx.stream, RESP_412_NO_GROUP).await,
        Err(error) => return handle_article_error(&mut ctx.stream, error).await,
    };
    let Some(current) = ctx.session.current_article() else {
        return write_simple(&mut ctx.stream, RESP_420_NO_CURRENT).await;
    };

    let neighbour = match direction {
        Direction::Next => ctx.engine.retriever.next_article(&view, current).await?,
        Direction::Previous => {
            ctx.engine
                .retriever
                .previous_article(&view, current)
                .await?
        }
    };

    match neighbour {
        Some(entry) => {
            ctx.session.set_current_article(entry.link.number);
            write_simple(
                &mut ctx.stream,
                &format!(
                    "223 {} {} Article exists\r\n",
                    entry.link.number, entry.article.message_id
                ),
            )
            .await
        }
        None => {
            let line = match direction {
                Direction::Next => RESP_421_NO_NEXT,
                Direction::Previous => RESP_422_NO_PREV,
            };
            write_simple(&mut ctx.stream, line).await
        }
    }
}

/// Handler for the NEXT command.
pub struct NextHandler;

impl CommandHandler for NextHandler {
    async fn handle<S: Conn>(ctx: &mut HandlerContext<S>, _args: &[String]) -> HandlerResult {
        navigate(ctx, Direction::Next).await
    }
}

/// Handler for the LAST command.
pub struct LastHandler;

impl CommandHandler for LastHandler {
    async fn handle<S: Conn>(ctx: &mut HandlerContext<S>, _args: &[String]) -> HandlerResult {
        navigate(ctx, Direction::Previous).await
    }
}
