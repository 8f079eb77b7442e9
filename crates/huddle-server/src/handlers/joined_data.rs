//! LoadJoinedServerData handler

use async_trait::async_trait;
use huddle_core::UserFilter;

use super::{HandlerContext, HandlerError, HandlerResult, Reply, Request, RequestHandler};
use crate::protocol::{failure_packet, response_packet, JoinedServerData, RequestType, Status};

/// Caller's persisted role, looked up by IP
pub struct JoinedServerDataHandler;

#[async_trait]
impl RequestHandler for JoinedServerDataHandler {
    async fn handle(&self, ctx: &HandlerContext, request: &Request) -> HandlerResult<Reply> {
        let filter = UserFilter::server(ctx.server_id).with_address(request.peer.ip());

        let users = match ctx.gateway.select_users(&filter).await {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!(
                    server_id = ctx.server_id,
                    peer = %request.peer,
                    error = %e,
                    "Failed to load caller role"
                );
                return Ok(Reply::Respond(failure_packet::<JoinedServerData>(
                    RequestType::LoadJoinedServerData,
                )));
            }
        };

        let user = users
            .first()
            .ok_or(HandlerError::UnknownUser(request.peer))?;

        Ok(Reply::Respond(response_packet(
            RequestType::LoadJoinedServerData,
            Status::Success,
            &JoinedServerData {
                admin: user.is_admin(),
            },
        )))
    }
}
