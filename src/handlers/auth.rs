//! Authentication and mode command handlers.

use super::utils::write_simple;
use super::{CommandHandler, Conn, HandlerContext, HandlerResult};
use crate::responses::*;
use tracing::{debug, info};

/// Handler for the AUTHINFO command.
pub struct AuthInfoHandler;

impl CommandHandler for AuthInfoHandler {
    async fn handle<S: Conn>(ctx: &mut HandlerContext<S>, args: &[String]) -> HandlerResult {
        let Some(keyword) = args.first() else {
            return write_simple(&mut ctx.stream, RESP_501_NOT_ENOUGH).await;
        };

        match keyword.to_ascii_uppercase().as_str() {
            "USER" => {
                if ctx.session.is_authenticated() {
                    return write_simple(&mut ctx.stream, RESP_502_ALREADY_AUTHENTICATED).await;
                }
                let Some(username) = args.get(1) else {
                    return write_simple(&mut ctx.stream, RESP_501_NOT_ENOUGH).await;
                };
                ctx.session.set_pending_username(username.clone());
                write_simple(&mut ctx.stream, RESP_381_PASSWORD_REQ).await
            }
            "PASS" => {
                if ctx.session.is_authenticated() {
                    return write_simple(&mut ctx.stream, RESP_502_ALREADY_AUTHENTICATED).await;
                }
                if args.len() < 2 {
                    return write_simple(&mut ctx.stream, RESP_501_NOT_ENOUGH).await;
                }
                let Some(username) = ctx.session.pending_username().map(str::to_string) else {
                    return write_simple(&mut ctx.stream, RESP_482_AUTH_SEQUENCE).await;
                };
                // Passwords that tokenized into several arguments are
                // rejoined with single spaces, normalizing whitespace runs.
                let password = args[1..].join(" ");

                match ctx
                    .engine
                    .directory
                    .verify_credentials(&username, &password)
                    .await?
                {
                    Some(admin) => {
                        if admin.caps.local_only && !ctx.session.peer_is_loopback() {
                            debug!("local-only account refused from remote peer");
                            return write_simple(&mut ctx.stream, RESP_481_AUTH_REJECTED).await;
                        }
                        info!("session authenticated");
                        debug!(username = %username, "authenticated administrator");
                        ctx.session.authenticate(admin);
                        write_simple(&mut ctx.stream, RESP_281_AUTH_OK).await
                    }
                    None => {
                        info!("authentication failed");
                        write_simple(&mut ctx.stream, RESP_481_AUTH_REJECTED).await
                    }
                }
            }
            _ => write_simple(&mut ctx.stream, RESP_501_SYNTAX).await,
        }
    }
}

/// Handler for the MODE command.
pub struct ModeHandler;

impl CommandHandler for ModeHandler {
    async fn handle<S: Conn>(ctx: &mut HandlerContext<S>, args: &[String]) -> HandlerResult {
        let Some(mode) = args.first() else {
            return write_simple(&mut ctx.stream, RESP_501_MISSING_MODE).await;
        };
        match mode.to_ascii_uppercase().as_str() {
            "READER" => {
                if ctx.session.can_post() {
                    write_simple(&mut ctx.stream, RESP_200_POSTING_ALLOWED).await
                } else {
                    write_simple(&mut ctx.stream, RESP_201_POSTING_PROHIBITED).await
                }
            }
            _ => write_simple(&mut ctx.stream, RESP_501_UNKNOWN_MODE).await,
        }
    }
}
