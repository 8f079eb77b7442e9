//! Request dispatcher
//!
//! Routes each inbound packet to the handler registered for its request
//! type and sends whatever the handler replies.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::time::Instant;

use super::{
    AdminMenuHandler, ChannelDataHandler, CreateChannelHandler, HandlerContext, HandlerError,
    JoinServerHandler, JoinedServerDataHandler, Reply, Request, RequestHandler,
    SendMessageHandler, ServerInformationHandler,
};
use crate::protocol::{Decode, Reader, RequestInfo, RequestType};
use crate::transport::{InboundPacket, SharedTransport};

pub struct RequestDispatcher {
    context: HandlerContext,
    transport: SharedTransport,
    handlers: HashMap<RequestType, Box<dyn RequestHandler>>,
}

impl RequestDispatcher {
    /// Dispatcher with no handlers registered
    pub fn new(context: HandlerContext, transport: SharedTransport) -> Self {
        Self {
            context,
            transport,
            handlers: HashMap::new(),
        }
    }

    /// Dispatcher with a handler for every client request type
    pub fn with_default_handlers(context: HandlerContext, transport: SharedTransport) -> Self {
        let mut dispatcher = Self::new(context, transport);
        dispatcher.register(RequestType::JoinServer, JoinServerHandler);
        dispatcher.register(RequestType::LoadServerInformation, ServerInformationHandler);
        dispatcher.register(RequestType::LoadChannelData, ChannelDataHandler);
        dispatcher.register(RequestType::SendMessage, SendMessageHandler);
        dispatcher.register(RequestType::LoadJoinedServerData, JoinedServerDataHandler);
        dispatcher.register(RequestType::LoadAdminMenuData, AdminMenuHandler);
        dispatcher.register(RequestType::CreateNewChannel, CreateChannelHandler);
        dispatcher
    }

    /// Register `handler` for `request_type`, replacing any previous one
    pub fn register<H>(&mut self, request_type: RequestType, handler: H)
    where
        H: RequestHandler + 'static,
    {
        self.handlers.insert(request_type, Box::new(handler));
    }

    pub fn context(&self) -> &HandlerContext {
        &self.context
    }

    /// Handle packets one at a time until the inbound channel closes.
    ///
    /// Sequential handling keeps messages from one sender in order.
    pub async fn run(&self, mut inbound: mpsc::Receiver<InboundPacket>) {
        while let Some(packet) = inbound.recv().await {
            self.dispatch(packet).await;
        }
        tracing::debug!(server_id = self.context.server_id, "Dispatcher stopped");
    }

    /// Handle one inbound packet
    pub async fn dispatch(&self, packet: InboundPacket) {
        let server_id = self.context.server_id;
        let mut reader = Reader::new(&packet.payload);
        let info = match RequestInfo::decode(&mut reader) {
            Ok(info) => info,
            Err(e) => {
                tracing::debug!(server_id, peer = %packet.peer, error = %e, "Dropping packet");
                return;
            }
        };
        let request_type = info.request_type;
        let header_len = packet.payload.len() - reader.remaining();

        let Some(handler) = self.handlers.get(&request_type) else {
            tracing::debug!(
                server_id,
                peer = %packet.peer,
                request_type = %request_type,
                "No handler for request type"
            );
            return;
        };

        self.touch(&packet);

        let request = Request {
            peer: packet.peer,
            request_type,
            payload: packet.payload.slice(header_len..),
        };
        tracing::trace!(server_id, peer = %packet.peer, request_type = %request_type, "Dispatching");

        match handler.handle(&self.context, &request).await {
            Ok(Reply::Respond(bytes)) => {
                if let Err(e) = self.transport.respond(&packet, bytes).await {
                    tracing::warn!(
                        server_id,
                        peer = %packet.peer,
                        request_type = %request_type,
                        error = %e,
                        "Failed to send response"
                    );
                }
            }
            Ok(Reply::Silent) => {}
            Err(e) => log_dropped(server_id, &request, &e),
        }
    }

    /// Any request from a known user counts as contact
    fn touch(&self, packet: &InboundPacket) {
        let mut state = self.context.state.lock();
        if let Some(id) = state.presence.find_by_address(packet.peer).map(|u| u.id) {
            state.presence.touch(id, packet.peer, Instant::now());
        }
    }
}

fn log_dropped(server_id: u16, request: &Request, error: &HandlerError) {
    if error.is_peer_error() {
        tracing::debug!(
            server_id,
            peer = %request.peer,
            request_type = %request.request_type,
            error = %error,
            "Request dropped"
        );
    } else {
        tracing::warn!(
            server_id,
            peer = %request.peer,
            request_type = %request.request_type,
            error = %error,
            "Request failed"
        );
    }
}

impl std::fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut registered: Vec<_> = self.handlers.keys().copied().collect();
        registered.sort_by_key(|t| t.as_u32());
        f.debug_struct("RequestDispatcher")
            .field("context", &self.context)
            .field("handlers", &registered)
            .finish_non_exhaustive()
    }
}
