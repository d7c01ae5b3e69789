//! Read-only query handlers
//!
//! Handles: GetClients, GetChannels, GetChatHistory

use tracing::debug;

use etcord_protocol::{ClientQuery, ErrorCode, ServerMessage};

use super::{HandlerContext, HandlerResult};

impl HandlerContext {
    /// Handle GetClients - list connected clients per the request mode
    pub fn handle_get_clients(&self, query: ClientQuery) -> HandlerResult {
        let clients = match &query {
            ClientQuery::All => self.registry.client_infos(None),
            ClientQuery::One(id) => self.registry.client_infos(Some(std::slice::from_ref(id))),
            ClientQuery::Many(ids) => self.registry.client_infos(Some(ids)),
        };

        debug!(
            "{} queried clients ({:?}): {} match(es)",
            self.client_id,
            query,
            clients.len()
        );

        HandlerResult::Response(ServerMessage::GetClients { clients })
    }

    /// Handle GetChannels - return the full channel table
    pub fn handle_get_channels(&self) -> HandlerResult {
        HandlerResult::Response(ServerMessage::GetChannels {
            channels: self.channels.infos(),
        })
    }

    /// Handle GetChatHistory - stored messages after an offset, in id order
    pub fn handle_get_chat_history(
        &self,
        channel_id: u16,
        count: u16,
        offset_id: u16,
    ) -> HandlerResult {
        let Some(channel) = self.channels.get(channel_id) else {
            return HandlerContext::error(
                ErrorCode::ChannelNotFound,
                format!("channel {} does not exist", channel_id),
            );
        };

        HandlerResult::Response(ServerMessage::GetChatHistory {
            channel_id,
            messages: channel.history(count, offset_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::default_context;
    use super::*;
    use etcord_protocol::ClientMessage;

    #[test]
    fn test_get_clients_all() {
        let (ctx, _rx) = default_context();
        ctx.handle_login("ada");

        let result = ctx.route_message(ClientMessage::GetClients {
            query: ClientQuery::All,
        });

        match result {
            HandlerResult::Response(ServerMessage::GetClients { clients }) => {
                assert_eq!(clients.len(), 1);
                assert_eq!(clients[0].id, ctx.client_id.value());
                assert_eq!(clients[0].name, "ada");
            }
            other => panic!("Expected GetClients response, got {:?}", other),
        }
    }

    #[test]
    fn test_get_clients_one_and_many() {
        let (ctx, _rx) = default_context();
        ctx.handle_login("ada");

        match ctx.handle_get_clients(ClientQuery::One(ctx.client_id.value())) {
            HandlerResult::Response(ServerMessage::GetClients { clients }) => {
                assert_eq!(clients.len(), 1)
            }
            other => panic!("Expected response, got {:?}", other),
        }

        match ctx.handle_get_clients(ClientQuery::Many(vec![9999])) {
            HandlerResult::Response(ServerMessage::GetClients { clients }) => {
                assert!(clients.is_empty())
            }
            other => panic!("Expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_get_channels() {
        let (ctx, _rx) = default_context();

        match ctx.handle_get_channels() {
            HandlerResult::Response(ServerMessage::GetChannels { channels }) => {
                assert_eq!(channels.len(), 1);
                assert_eq!(channels[0].name, "general");
            }
            other => panic!("Expected GetChannels response, got {:?}", other),
        }
    }

    #[test]
    fn test_get_chat_history() {
        let (ctx, _rx) = default_context();
        let channel = ctx.channels.get(1).unwrap();
        channel.append(7, "ada", "first");
        channel.append(7, "ada", "second");

        match ctx.handle_get_chat_history(1, 0, 1) {
            HandlerResult::Response(ServerMessage::GetChatHistory {
                channel_id,
                messages,
            }) => {
                assert_eq!(channel_id, 1);
                assert_eq!(messages.len(), 1);
                assert_eq!(messages[0].content, "second");
            }
            other => panic!("Expected GetChatHistory response, got {:?}", other),
        }
    }

    #[test]
    fn test_get_chat_history_unknown_channel() {
        let (ctx, _rx) = default_context();

        match ctx.handle_get_chat_history(999, 0, 0) {
            HandlerResult::Response(ServerMessage::Error { code, .. }) => {
                assert_eq!(code, ErrorCode::ChannelNotFound)
            }
            other => panic!("Expected error response, got {:?}", other),
        }
    }
}
