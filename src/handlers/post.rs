//! Posting and feature negotiation command handlers.

use super::utils::write_simple;
use super::{CommandHandler, Conn, HandlerContext, HandlerResult};
use crate::codec::read_article;
use crate::poster::PostOutcome;
use crate::responses::*;
use tracing::error;

/// Handler for the POST command.
pub struct PostHandler;

impl CommandHandler for PostHandler {
    async fn handle<S: Conn>(ctx: &mut HandlerContext<S>, _args: &[String]) -> HandlerResult {
        if !ctx.session.can_post() {
            return write_simple(&mut ctx.stream, RESP_440_POSTING_NOT_ALLOWED).await;
        }

        write_simple(&mut ctx.stream, RESP_340_SEND_ARTICLE).await?;

        // The session now accumulates raw article bytes; no other command
        // runs until the terminator arrives.
        let raw = read_article(&mut ctx.stream).await?;

        let identity = ctx.session.identity().cloned();
        match ctx.engine.poster.submit(&raw, identity.as_ref()).await {
            Ok(PostOutcome::Received) => {
                write_simple(&mut ctx.stream, RESP_240_ARTICLE_RECEIVED).await
            }
            Ok(PostOutcome::Rejected) => {
                write_simple(&mut ctx.stream, RESP_441_POSTING_FAILED).await
            }
            Ok(PostOutcome::PermissionDenied) => {
                write_simple(&mut ctx.stream, RESP_480_PERMISSION).await
            }
            Err(e) => {
                error!(error = %e, "post processing failed");
                write_simple(&mut ctx.stream, RESP_403_BACKEND).await
            }
        }
    }
}

/// Handler for the XFEATURE command; the only supported feature is
/// COMPRESS GZIP TERMINATOR.
pub struct XFeatureHandler;

impl CommandHandler for XFeatureHandler {
    async fn handle<S: Conn>(ctx: &mut HandlerContext<S>, args: &[String]) -> HandlerResult {
        let matches = args.len() == 3
            && args[0].eq_ignore_ascii_case("COMPRESS")
            && args[1].eq_ignore_ascii_case("GZIP")
            && args[2].eq_ignore_ascii_case("TERMINATOR");
        if matches {
            ctx.session.enable_gzip();
            write_simple(&mut ctx.stream, RESP_290_FEATURE_ENABLED).await
        } else {
            write_simple(&mut ctx.stream, RESP_501_INVALID_ARG).await
        }
    }
}
