//! SendMessage handler

use async_trait::async_trait;
use tokio::time::Instant;

use super::{HandlerContext, HandlerError, HandlerResult, Reply, Request, RequestHandler};
use crate::protocol::SendMessageRequest;

/// Stores the message and queues it for the next broadcast tick.
///
/// Never answers: the sender sees its own message in the next push, like
/// every other viewer of the channel. Messages from unknown or offline
/// users, or aimed at another server's channel, are dropped.
pub struct SendMessageHandler;

#[async_trait]
impl RequestHandler for SendMessageHandler {
    async fn handle(&self, ctx: &HandlerContext, request: &Request) -> HandlerResult<Reply> {
        let SendMessageRequest { channel_id, text } = request.decode_payload()?;

        let sender = ctx
            .find_user(request.peer)
            .ok_or(HandlerError::UnknownUser(request.peer))?;
        if !sender.is_online() {
            return Err(HandlerError::UserOffline { user_id: sender.id });
        }
        ctx.require_channel(channel_id).await?;

        let inserted = ctx
            .gateway
            .insert_message(&text, channel_id, sender.id)
            .await?;
        let message = inserted.into_message(channel_id, sender.id, text);

        tracing::trace!(
            server_id = ctx.server_id,
            message_id = message.id,
            channel_id,
            sender_id = sender.id,
            "Message queued for broadcast"
        );

        let mut state = ctx.state.lock();
        state.pending.push(message);
        state
            .presence
            .mark_online(sender.id, request.peer, Instant::now());

        Ok(Reply::Silent)
    }
}
