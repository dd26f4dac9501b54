pub mod parse;
pub use parse::{ArticleRange, Command, parse_article, parse_command, parse_datetime, parse_range};

pub mod auth;
pub mod blobs;
pub mod cache;
pub mod codec;
pub mod config;
pub mod control;
pub mod error;
pub mod handlers;
pub mod models;
pub mod overview;
pub mod poster;
pub mod responses;
pub mod retriever;
pub mod server;
pub mod session;
pub mod storage;
pub mod wildmat;

use crate::auth::DynDirectory;
use crate::cache::ArticleCache;
use crate::config::Config;
use crate::handlers::{HandlerContext, dispatch_command};
use crate::poster::Poster;
use crate::retriever::Retriever;
use crate::session::Session;
use crate::storage::DynStore;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, error};

/// Shared server components handed to every connection.
#[derive(Clone)]
pub struct Engine {
    pub store: DynStore,
    pub directory: DynDirectory,
    pub retriever: Arc<Retriever>,
    pub poster: Arc<Poster>,
    pub config: Arc<RwLock<Config>>,
}

impl Engine {
    /// Wire up an engine over already-opened backends.
    pub fn new(store: DynStore, directory: DynDirectory, cfg: Config) -> Self {
        let cache = Arc::new(ArticleCache::new(
            cfg.cache.max_bytes(),
            Duration::from_secs(cfg.cache.ttl_secs),
        ));
        let retriever = Arc::new(Retriever::new(store.clone(), cache.clone()));
        let poster = Arc::new(Poster::new(store.clone(), cache, cfg.site_name.clone()));
        Self {
            store,
            directory,
            retriever,
            poster,
            config: Arc::new(RwLock::new(cfg)),
        }
    }
}

/// How a connection loop ended.
pub enum SessionEnd<S> {
    /// QUIT, EOF, timeout or error: the stream is finished.
    Closed,
    /// STARTTLS accepted: the caller must wrap the returned socket in TLS
    /// and run a fresh session over it.
    UpgradeTls(S),
}

/// Handle a client connection.
///
/// Runs the per-connection command loop: greeting, then one command per
/// line until QUIT, EOF or idle timeout. STARTTLS hands the raw socket
/// back to the caller for the in-place upgrade.
///
/// # Errors
///
/// Returns an error only for transport failures; protocol and backend
/// errors are answered on the wire and the loop continues.
#[tracing::instrument(skip(socket, engine))]
pub async fn handle_client<S>(
    socket: S,
    engine: Engine,
    is_tls: bool,
    peer_is_loopback: bool,
    starttls_available: bool,
) -> Result<SessionEnd<S>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    use crate::handlers::utils::write_simple;
    use crate::responses::*;

    // Read once at connection start; a SIGHUP reload affects new
    // connections only.
    let (idle_timeout, posting_allowed) = {
        let cfg = engine.config.read().await;
        (
            Duration::from_secs(cfg.idle_timeout_secs),
            cfg.allow_posting,
        )
    };

    let mut ctx = HandlerContext {
        stream: BufReader::new(socket),
        engine,
        session: Session::new(is_tls, peer_is_loopback, posting_allowed),
        starttls_available,
    };

    if ctx.session.can_post() {
        write_simple(&mut ctx.stream, RESP_200_READY).await?;
    } else {
        write_simple(&mut ctx.stream, RESP_201_READY_NO_POST).await?;
    }

    let mut line = String::new();
    loop {
        line.clear();

        let read_result =
            tokio::time::timeout(idle_timeout, ctx.stream.read_line(&mut line)).await;
        let n = match read_result {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                debug!(
                    "connection idle for {} seconds, closing",
                    idle_timeout.as_secs()
                );
                break;
            }
        };
        if n == 0 {
            break;
        }

        let trimmed = line.trim_end_matches(['\r', '\n']);
        let Ok((_, cmd)) = parse_command(trimmed) else {
            write_simple(&mut ctx.stream, RESP_500_SYNTAX).await?;
            continue;
        };

        debug!("command" = %cmd.name);

        // QUIT and STARTTLS own the stream, so they bypass the dispatcher.
        match cmd.name.as_str() {
            "QUIT" => {
                write_simple(&mut ctx.stream, RESP_205_CLOSING).await?;
                break;
            }
            "STARTTLS" => {
                if ctx.session.is_tls() {
                    write_simple(&mut ctx.stream, RESP_502_ALREADY_AUTHENTICATED).await?;
                } else if !starttls_available {
                    write_simple(&mut ctx.stream, RESP_580_NO_TLS).await?;
                } else {
                    write_simple(&mut ctx.stream, RESP_382_CONTINUE_TLS).await?;
                    return Ok(SessionEnd::UpgradeTls(ctx.stream.into_inner()));
                }
                continue;
            }
            _ => {}
        }

        if let Err(e) = dispatch_command(&mut ctx, &cmd).await {
            // A dead transport abandons the session without a further
            // response; anything else is a backend failure answered 403.
            if e.downcast_ref::<std::io::Error>().is_some() {
                return Err(e);
            }
            error!(command = %cmd.name, error = %e, "command failed");
            if write_simple(&mut ctx.stream, RESP_403_BACKEND).await.is_err() {
                break;
            }
        }
    }

    Ok(SessionEnd::Closed)
}
