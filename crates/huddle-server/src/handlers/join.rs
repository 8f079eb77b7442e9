//! JoinServer handler

use async_trait::async_trait;
use tokio::time::Instant;

use super::{HandlerContext, HandlerResult, Reply, Request, RequestHandler};
use crate::protocol::{failure_packet, response_packet, Empty, JoinServerRequest, RequestType, Status};

/// Registers the caller as a member and starts tracking them offline
pub struct JoinServerHandler;

#[async_trait]
impl RequestHandler for JoinServerHandler {
    async fn handle(&self, ctx: &HandlerContext, request: &Request) -> HandlerResult<Reply> {
        let JoinServerRequest { username } = request.decode_payload()?;

        if username.is_blank() {
            tracing::debug!(
                server_id = ctx.server_id,
                peer = %request.peer,
                "Join rejected: empty username"
            );
            return Ok(Reply::Respond(failure_packet::<Empty>(RequestType::JoinServer)));
        }

        let record = match ctx
            .gateway
            .insert_user(ctx.server_id, request.peer.ip(), &username)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    server_id = ctx.server_id,
                    peer = %request.peer,
                    username = %username,
                    error = %e,
                    "Join failed"
                );
                return Ok(Reply::Respond(failure_packet::<Empty>(RequestType::JoinServer)));
            }
        };

        ctx.state
            .lock()
            .presence
            .upsert_on_join(&record, request.peer, Instant::now());

        tracing::info!(
            server_id = ctx.server_id,
            user_id = record.id,
            username = %record.username,
            peer = %request.peer,
            "User joined"
        );

        Ok(Reply::Respond(response_packet(
            RequestType::JoinServer,
            Status::Success,
            &Empty,
        )))
    }
}
