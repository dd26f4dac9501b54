//! Information command handlers.

use super::utils::write_simple;
use super::{CommandHandler, Conn, HandlerContext, HandlerResult};
use crate::codec::{MultilineBody, send_multiline};
use crate::responses::*;

/// Handler for the CAPABILITIES command.
pub struct CapabilitiesHandler;

impl CommandHandler for CapabilitiesHandler {
    async fn handle<S: Conn>(ctx: &mut HandlerContext<S>, _args: &[String]) -> HandlerResult {
        let mut body = MultilineBody::new();
        body.push_line(CAP_VERSION);
        body.push_line(CAP_IMPLEMENTATION);
        body.push_line(CAP_READER);
        body.push_line(CAP_POST);
        body.push_line(CAP_HDR);
        body.push_line(CAP_OVER);
        body.push_line(CAP_LIST);
        body.push_line(CAP_AUTHINFO);
        body.push_line(CAP_XFEATURE);
        if ctx.starttls_available && !ctx.session.is_tls() {
            body.push_line(CAP_STARTTLS);
        }
        send_multiline(
            &mut ctx.stream,
            RESP_101_CAPABILITIES,
            body,
            ctx.session.gzip_active(),
        )
        .await
    }
}

/// Handler for the DATE command.
pub struct DateHandler;

impl CommandHandler for DateHandler {
    async fn handle<S: Conn>(ctx: &mut HandlerContext<S>, _args: &[String]) -> HandlerResult {
        let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
        write_simple(&mut ctx.stream, &format!("111 {stamp}\r\n")).await
    }
}
