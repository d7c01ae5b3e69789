//! Shared data types carried inside protocol messages

/// Kind of a channel
///
/// Only `Text` and `Multi` channels accept chat messages. `Voice` exists in
/// the data model but has no behavior yet; `None` acts as a category node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelType {
    None = 0,
    Text = 1,
    Voice = 2,
    Multi = 3,
}

impl ChannelType {
    pub fn from_wire(v: u8) -> Option<Self> {
        match v {
            0 => Some(ChannelType::None),
            1 => Some(ChannelType::Text),
            2 => Some(ChannelType::Voice),
            3 => Some(ChannelType::Multi),
            _ => None,
        }
    }

    /// Whether chat messages may be posted to a channel of this kind
    pub fn accepts_text(self) -> bool {
        matches!(self, ChannelType::Text | ChannelType::Multi)
    }
}

/// A connected client as seen by other clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub id: u16,
    pub name: String,
}

/// Channel metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: u16,
    pub parent_id: u16,
    pub name: String,
    pub kind: ChannelType,
}

/// One stored chat message
///
/// Immutable once stored; `message_id` is unique and dense within its
/// channel, not globally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub message_id: u16,
    pub sender_id: u16,
    pub sender_name: String,
    pub content: String,
}
