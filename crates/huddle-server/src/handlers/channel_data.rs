//! LoadChannelData handler

use async_trait::async_trait;
use huddle_core::MessageFilter;
use tokio::time::Instant;

use super::{HandlerContext, HandlerError, HandlerResult, Reply, Request, RequestHandler};
use crate::protocol::{
    failure_packet, response_packet, LoadChannelDataRequest, MessageBatch, RequestType, Status,
};

/// Full history of one channel. Also makes that channel the caller's
/// active channel and brings them online. Channels of other hosted servers
/// are never served.
pub struct ChannelDataHandler;

#[async_trait]
impl RequestHandler for ChannelDataHandler {
    async fn handle(&self, ctx: &HandlerContext, request: &Request) -> HandlerResult<Reply> {
        let LoadChannelDataRequest { channel_id } = request.decode_payload()?;
        ctx.require_channel(channel_id).await?;

        let user_id = {
            let mut state = ctx.state.lock();
            let user_id = state
                .presence
                .find_by_address(request.peer)
                .map(|user| user.id)
                .ok_or(HandlerError::UnknownUser(request.peer))?;
            state.presence.set_active_channel(user_id, channel_id);
            state
                .presence
                .mark_online(user_id, request.peer, Instant::now());
            user_id
        };

        tracing::debug!(
            server_id = ctx.server_id,
            user_id,
            channel_id,
            "Loading channel history"
        );

        match ctx
            .gateway
            .select_messages(&MessageFilter::channel(channel_id))
            .await
        {
            Ok(messages) => {
                let batch: MessageBatch = messages.iter().collect();
                Ok(Reply::Respond(response_packet(
                    RequestType::LoadChannelData,
                    Status::Success,
                    &batch,
                )))
            }
            Err(e) => {
                tracing::warn!(
                    server_id = ctx.server_id,
                    channel_id,
                    error = %e,
                    "Failed to load channel history"
                );
                Ok(Reply::Respond(failure_packet::<MessageBatch>(
                    RequestType::LoadChannelData,
                )))
            }
        }
    }
}
