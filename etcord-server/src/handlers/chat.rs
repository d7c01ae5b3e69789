//! Chat and voice message handlers
//!
//! Handles: ChatMessage, VoiceChannelJoin, VoiceChannelLeave

use tracing::debug;

use etcord_protocol::{ErrorCode, ServerMessage};

use super::{HandlerContext, HandlerResult};

impl HandlerContext {
    /// Handle ChatMessage - store the message and fan it out to everyone
    ///
    /// Requires a completed login: the response carries the sender's name,
    /// so anonymous chat would put empty strings on the wire. The channel
    /// lock covers only the counter increment and store insert; the caller
    /// performs the broadcast well after it is released.
    pub fn handle_chat_message(&self, channel_id: u16, content: &str) -> HandlerResult {
        let sender_name = match self.registry.name(self.client_id) {
            Some(name) if !name.is_empty() => name,
            _ => {
                return HandlerContext::error(
                    ErrorCode::NotLoggedIn,
                    "login before sending chat messages",
                );
            }
        };

        let Some(channel) = self.channels.get(channel_id) else {
            return HandlerContext::error(
                ErrorCode::ChannelNotFound,
                format!("channel {} does not exist", channel_id),
            );
        };

        if !channel.kind().accepts_text() {
            return HandlerContext::error(
                ErrorCode::ChannelTypeMismatch,
                format!("channel {} does not accept text", channel_id),
            );
        }

        let message = channel.append(self.client_id.value(), &sender_name, content);

        debug!(
            "{} posted message {} to channel {}",
            self.client_id, message.message_id, channel_id
        );

        HandlerResult::Broadcast(ServerMessage::ChatMessage {
            channel_id,
            message,
        })
    }

    /// Handle VoiceChannelJoin - decodable, but voice has no behavior yet
    pub fn handle_voice_channel_join(&self, channel_id: u16) -> HandlerResult {
        debug!(
            "{} requested voice join on channel {}",
            self.client_id, channel_id
        );
        HandlerContext::error(ErrorCode::NotImplemented, "voice channels not implemented")
    }

    /// Handle VoiceChannelLeave - decodable, but voice has no behavior yet
    pub fn handle_voice_channel_leave(&self, channel_id: u16) -> HandlerResult {
        debug!(
            "{} requested voice leave on channel {}",
            self.client_id, channel_id
        );
        HandlerContext::error(ErrorCode::NotImplemented, "voice channels not implemented")
    }
}
