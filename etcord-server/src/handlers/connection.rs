//! Connection-related message handlers
//!
//! Handles: Login, client-originated Error reports

use tracing::{info, warn};

use etcord_protocol::{ErrorCode, ServerMessage};

use super::{HandlerContext, HandlerResult};

impl HandlerContext {
    /// Handle Login - register the sender's display name
    ///
    /// The codec already guarantees a non-empty name. Success is silent for
    /// the sender; everyone else learns about the arrival.
    pub fn handle_login(&self, name: &str) -> HandlerResult {
        if !self.registry.set_name(self.client_id, name) {
            // Connection raced its own disconnect; nothing to do
            return HandlerResult::NoResponse;
        }

        info!("{} logged in as {:?}", self.client_id, name);

        HandlerResult::BroadcastExceptSender(ServerMessage::ClientConnected {
            client_id: self.client_id.value(),
            name: name.to_string(),
        })
    }

    /// Handle an Error frame sent by a client: surfaced to the log, ignored
    pub fn handle_client_error(&self, code: ErrorCode, message: &str) -> HandlerResult {
        warn!(
            "{} reported error {:?}: {}",
            self.client_id, code, message
        );
        HandlerResult::NoResponse
    }
}
