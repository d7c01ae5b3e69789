//! Message handlers for client requests
//!
//! Routes each decoded [`ClientMessage`] to its handler and turns the
//! outcome into a [`HandlerResult`] the connection task knows how to
//! deliver. Validation and domain failures become `Error` frames for the
//! sender; they never tear down the connection or the server.

mod chat;
mod connection;
mod query;

use std::sync::Arc;

use etcord_protocol::{ClientMessage, ErrorCode, ServerMessage};

use crate::channel::ChannelMap;
use crate::registry::{ClientId, ClientRegistry};

/// Context for message handlers
///
/// Provides access to the server state needed to handle one client's
/// requests; one context lives per connection.
pub struct HandlerContext {
    /// Client connection registry for delivery and broadcast
    pub registry: Arc<ClientRegistry>,
    /// The static channel table
    pub channels: Arc<ChannelMap>,
    /// The client making the requests
    pub client_id: ClientId,
}

/// Result of handling a message
#[derive(Debug, PartialEq)]
pub enum HandlerResult {
    /// Single response to send back to the sender
    Response(ServerMessage),
    /// One message for every connected client, sender included
    Broadcast(ServerMessage),
    /// One message for every connected client except the sender
    BroadcastExceptSender(ServerMessage),
    /// No response needed (silence = success)
    NoResponse,
}

impl HandlerContext {
    pub fn new(
        registry: Arc<ClientRegistry>,
        channels: Arc<ChannelMap>,
        client_id: ClientId,
    ) -> Self {
        Self {
            registry,
            channels,
            client_id,
        }
    }

    /// Route a client message to the appropriate handler
    pub fn route_message(&self, msg: ClientMessage) -> HandlerResult {
        match msg {
            ClientMessage::Error { code, message } => {
                self.handle_client_error(code, &message)
            }

            ClientMessage::Login { name } => self.handle_login(&name),

            ClientMessage::GetClients { query } => self.handle_get_clients(query),

            ClientMessage::GetChannels => self.handle_get_channels(),

            ClientMessage::GetChatHistory {
                channel_id,
                count,
                offset_id,
            } => self.handle_get_chat_history(channel_id, count, offset_id),

            ClientMessage::ChatMessage {
                channel_id,
                content,
            } => self.handle_chat_message(channel_id, &content),

            ClientMessage::VoiceChannelJoin { channel_id } => {
                self.handle_voice_channel_join(channel_id)
            }

            ClientMessage::VoiceChannelLeave { channel_id } => {
                self.handle_voice_channel_leave(channel_id)
            }
        }
    }

    /// Shorthand for an error response to the sender
    pub(crate) fn error(code: ErrorCode, message: impl Into<String>) -> HandlerResult {
        HandlerResult::Response(ServerMessage::Error {
            code,
            message: message.into(),
        })
    }
}
