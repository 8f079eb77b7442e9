//! Channel list and channel creation handlers

use async_trait::async_trait;
use huddle_core::ChannelFilter;

use super::{HandlerContext, HandlerResult, Reply, Request, RequestHandler};
use crate::protocol::{
    failure_packet, response_packet, ChannelList, CreateNewChannelRequest, Empty, RequestType,
    Status,
};

async fn channel_list(ctx: &HandlerContext, request_type: RequestType) -> Reply {
    match ctx
        .gateway
        .select_channels(&ChannelFilter::server(ctx.server_id))
        .await
    {
        Ok(channels) => Reply::Respond(response_packet(
            request_type,
            Status::Success,
            &ChannelList(channels),
        )),
        Err(e) => {
            tracing::warn!(
                server_id = ctx.server_id,
                request_type = %request_type,
                error = %e,
                "Failed to load channels"
            );
            Reply::Respond(failure_packet::<ChannelList>(request_type))
        }
    }
}

/// Channel list for anyone who can reach the server
pub struct ServerInformationHandler;

#[async_trait]
impl RequestHandler for ServerInformationHandler {
    async fn handle(&self, ctx: &HandlerContext, _request: &Request) -> HandlerResult<Reply> {
        Ok(channel_list(ctx, RequestType::LoadServerInformation).await)
    }
}

/// Channel list for the admin view.
///
/// The caller's role is not checked here; the client decides who sees the
/// admin view.
pub struct AdminMenuHandler;

#[async_trait]
impl RequestHandler for AdminMenuHandler {
    async fn handle(&self, ctx: &HandlerContext, request: &Request) -> HandlerResult<Reply> {
        let role = ctx.find_user(request.peer).map(|user| user.role);
        tracing::debug!(
            server_id = ctx.server_id,
            peer = %request.peer,
            role = ?role,
            "Admin menu requested"
        );
        Ok(channel_list(ctx, RequestType::LoadAdminMenuData).await)
    }
}

/// Creates a channel on this server; no role check
pub struct CreateChannelHandler;

#[async_trait]
impl RequestHandler for CreateChannelHandler {
    async fn handle(&self, ctx: &HandlerContext, request: &Request) -> HandlerResult<Reply> {
        let CreateNewChannelRequest { name } = request.decode_payload()?;

        if name.is_blank() {
            return Ok(Reply::Respond(failure_packet::<Empty>(
                RequestType::CreateNewChannel,
            )));
        }

        match ctx.gateway.insert_channel(&name, ctx.server_id).await {
            Ok(channel) => {
                tracing::info!(
                    server_id = ctx.server_id,
                    channel_id = channel.id,
                    name = %channel.name,
                    peer = %request.peer,
                    "Channel created"
                );
                Ok(Reply::Respond(response_packet(
                    RequestType::CreateNewChannel,
                    Status::Success,
                    &Empty,
                )))
            }
            Err(e) => {
                tracing::warn!(
                    server_id = ctx.server_id,
                    name = %name,
                    error = %e,
                    "Channel creation failed"
                );
                Ok(Reply::Respond(failure_packet::<Empty>(
                    RequestType::CreateNewChannel,
                )))
            }
        }
    }
}
