//! NNTP command handlers, organized by category, plus the dispatch table.

pub mod article;
pub mod auth;
pub mod group;
pub mod info;
pub mod post;
pub mod utils;

use crate::Engine;
use crate::parse::Command;
use crate::session::Session;
use anyhow::Result;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Bound for the connection stream. `BufReader` passes writes through to
/// the underlying stream, so one object serves both directions and the raw
/// socket can be recovered for a STARTTLS upgrade.
pub trait Conn: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Conn for T {}

/// Result type for command handlers.
pub type HandlerResult = Result<()>;

/// Context passed to command handlers.
pub struct HandlerContext<S> {
    pub stream: BufReader<S>,
    pub engine: Engine,
    pub session: Session,
    pub starttls_available: bool,
}

/// Trait for command handlers.
#[allow(async_fn_in_trait)]
pub trait CommandHandler {
    async fn handle<S: Conn>(ctx: &mut HandlerContext<S>, args: &[String]) -> HandlerResult;
}

/// Dispatch a command to the appropriate handler.
///
/// QUIT and STARTTLS never reach this table; the connection loop owns them
/// because they end or replace the stream.
pub async fn dispatch_command<S: Conn>(ctx: &mut HandlerContext<S>, cmd: &Command) -> HandlerResult {
    match cmd.name.as_str() {
        // Article retrieval commands
        "ARTICLE" => article::ArticleHandler::handle(ctx, &cmd.args).await,
        "HEAD" => article::HeadHandler::handle(ctx, &cmd.args).await,
        "BODY" => article::BodyHandler::handle(ctx, &cmd.args).await,
        "STAT" => article::StatHandler::handle(ctx, &cmd.args).await,

        // Group and navigation commands
        "GROUP" => group::GroupHandler::handle(ctx, &cmd.args).await,
        "LIST" => group::ListHandler::handle(ctx, &cmd.args).await,
        "LISTGROUP" => group::ListGroupHandler::handle(ctx, &cmd.args).await,
        "NEXT" => group::NextHandler::handle(ctx, &cmd.args).await,
        "LAST" => group::LastHandler::handle(ctx, &cmd.args).await,
        "NEWGROUPS" => group::NewGroupsHandler::handle(ctx, &cmd.args).await,

        // Header and metadata commands
        "HDR" => article::HdrHandler::handle(ctx, &cmd.args).await,
        "XHDR" => article::XhdrHandler::handle(ctx, &cmd.args).await,
        "OVER" | "XOVER" => article::OverHandler::handle(ctx, &cmd.args).await,

        // Posting commands
        "POST" => post::PostHandler::handle(ctx, &cmd.args).await,
        "XFEATURE" => post::XFeatureHandler::handle(ctx, &cmd.args).await,

        // Authentication and mode commands
        "AUTHINFO" => auth::AuthInfoHandler::handle(ctx, &cmd.args).await,
        "MODE" => auth::ModeHandler::handle(ctx, &cmd.args).await,

        // Information commands
        "CAPABILITIES" => info::CapabilitiesHandler::handle(ctx, &cmd.args).await,
        "DATE" => info::DateHandler::handle(ctx, &cmd.args).await,

        // Unknown command
        _ => {
            use crate::responses::RESP_500_UNKNOWN_CMD;
            utils::write_simple(&mut ctx.stream, RESP_500_UNKNOWN_CMD).await
        }
    }
}
