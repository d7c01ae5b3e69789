//! Client-server message types and their payload codecs
//!
//! Requests ([`ClientMessage`]) and responses/notifications
//! ([`ServerMessage`]) share the same type tag; direction is a property of
//! the connection role. Every message value carries its variant, so the tag
//! lookup in [`ClientMessage::msg_type`] / [`ServerMessage::msg_type`] is an
//! exhaustive match on the enum — an unmapped variant is a compile error,
//! never a silent fallback to tag 0.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::types::{ChannelInfo, ChannelType, ChatMessage, ClientInfo};
use crate::wire;

/// Wire type tags
///
/// Gap values 7-9 and 11-19 are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgType {
    Error = 0,
    Login = 1,
    ClientConnected = 2,
    ClientDisconnected = 3,
    GetClients = 4,
    GetChannels = 5,
    GetChatHistory = 6,
    ChatMessage = 10,
    VoiceChannelJoin = 20,
    VoiceChannelLeave = 21,
}

impl TryFrom<u8> for MsgType {
    type Error = ProtocolError;

    fn try_from(tag: u8) -> Result<Self, ProtocolError> {
        match tag {
            0 => Ok(MsgType::Error),
            1 => Ok(MsgType::Login),
            2 => Ok(MsgType::ClientConnected),
            3 => Ok(MsgType::ClientDisconnected),
            4 => Ok(MsgType::GetClients),
            5 => Ok(MsgType::GetChannels),
            6 => Ok(MsgType::GetChatHistory),
            10 => Ok(MsgType::ChatMessage),
            20 => Ok(MsgType::VoiceChannelJoin),
            21 => Ok(MsgType::VoiceChannelLeave),
            other => Err(ProtocolError::UnknownType(other)),
        }
    }
}

impl std::fmt::Display for MsgType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MsgType::Error => "Error",
            MsgType::Login => "Login",
            MsgType::ClientConnected => "ClientConnected",
            MsgType::ClientDisconnected => "ClientDisconnected",
            MsgType::GetClients => "GetClients",
            MsgType::GetChannels => "GetChannels",
            MsgType::GetChatHistory => "GetChatHistory",
            MsgType::ChatMessage => "ChatMessage",
            MsgType::VoiceChannelJoin => "VoiceChannelJoin",
            MsgType::VoiceChannelLeave => "VoiceChannelLeave",
        };
        f.write_str(name)
    }
}

/// Error codes carried in Error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    Unknown = 0,
    NotImplemented = 1,
    NotLoggedIn = 2,
    ChannelNotFound = 3,
    ChannelTypeMismatch = 4,
    EmptyField = 5,
    MalformedMessage = 6,
}

impl ErrorCode {
    pub fn from_wire(v: u16) -> Self {
        match v {
            1 => ErrorCode::NotImplemented,
            2 => ErrorCode::NotLoggedIn,
            3 => ErrorCode::ChannelNotFound,
            4 => ErrorCode::ChannelTypeMismatch,
            5 => ErrorCode::EmptyField,
            6 => ErrorCode::MalformedMessage,
            _ => ErrorCode::Unknown,
        }
    }
}

/// Selector for a GetClients request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientQuery {
    /// All connected clients
    All,
    /// One client by id
    One(u16),
    /// An explicit id list
    Many(Vec<u16>),
}

const QUERY_ALL: u8 = 0;
const QUERY_ONE: u8 = 1;
const QUERY_MANY: u8 = 2;

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Error report from a client; logged and otherwise ignored
    Error { code: ErrorCode, message: String },

    /// Register a display name for this connection
    Login { name: String },

    /// Request the list of connected clients
    GetClients { query: ClientQuery },

    /// Request the channel table
    GetChannels,

    /// Request stored messages from a channel
    GetChatHistory {
        channel_id: u16,
        count: u16,
        offset_id: u16,
    },

    /// Post a chat message to a channel
    ChatMessage { channel_id: u16, content: String },

    /// Join a voice channel (no behavior yet)
    VoiceChannelJoin { channel_id: u16 },

    /// Leave a voice channel (no behavior yet)
    VoiceChannelLeave { channel_id: u16 },
}

impl ClientMessage {
    /// The wire tag for this message, read straight off the variant
    pub fn msg_type(&self) -> MsgType {
        match self {
            ClientMessage::Error { .. } => MsgType::Error,
            ClientMessage::Login { .. } => MsgType::Login,
            ClientMessage::GetClients { .. } => MsgType::GetClients,
            ClientMessage::GetChannels => MsgType::GetChannels,
            ClientMessage::GetChatHistory { .. } => MsgType::GetChatHistory,
            ClientMessage::ChatMessage { .. } => MsgType::ChatMessage,
            ClientMessage::VoiceChannelJoin { .. } => MsgType::VoiceChannelJoin,
            ClientMessage::VoiceChannelLeave { .. } => MsgType::VoiceChannelLeave,
        }
    }

    /// Encode the payload (everything after the type tag)
    pub fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        match self {
            ClientMessage::Error { code, message } => {
                dst.put_u16(*code as u16);
                wire::put_string(dst, message, "message")?;
            }
            ClientMessage::Login { name } => {
                if name.is_empty() {
                    return Err(ProtocolError::EmptyField("name"));
                }
                wire::put_string(dst, name, "name")?;
            }
            ClientMessage::GetClients { query } => match query {
                ClientQuery::All => dst.put_u8(QUERY_ALL),
                ClientQuery::One(id) => {
                    dst.put_u8(QUERY_ONE);
                    dst.put_u16(*id);
                }
                ClientQuery::Many(ids) => {
                    dst.put_u8(QUERY_MANY);
                    wire::put_id_list(dst, ids, "client_ids")?;
                }
            },
            ClientMessage::GetChannels => {}
            ClientMessage::GetChatHistory {
                channel_id,
                count,
                offset_id,
            } => {
                dst.put_u16(*channel_id);
                dst.put_u16(*count);
                dst.put_u16(*offset_id);
            }
            ClientMessage::ChatMessage {
                channel_id,
                content,
            } => {
                if content.is_empty() {
                    return Err(ProtocolError::EmptyField("content"));
                }
                dst.put_u16(*channel_id);
                wire::put_string(dst, content, "content")?;
            }
            ClientMessage::VoiceChannelJoin { channel_id }
            | ClientMessage::VoiceChannelLeave { channel_id } => {
                dst.put_u16(*channel_id);
            }
        }
        Ok(())
    }

    /// Decode a payload for the given tag
    pub fn decode_payload(ty: MsgType, buf: &mut Bytes) -> Result<Self, ProtocolError> {
        match ty {
            MsgType::Error => Ok(ClientMessage::Error {
                code: ErrorCode::from_wire(wire::get_u16(buf, "code")?),
                message: wire::get_string(buf, "message")?,
            }),
            MsgType::Login => Ok(ClientMessage::Login {
                name: wire::get_required_string(buf, "name")?,
            }),
            MsgType::GetClients => {
                let query = match wire::get_u8(buf, "mode")? {
                    QUERY_ALL => ClientQuery::All,
                    QUERY_ONE => ClientQuery::One(wire::get_u16(buf, "client_id")?),
                    QUERY_MANY => ClientQuery::Many(wire::get_id_list(buf, "client_ids")?),
                    _ => return Err(ProtocolError::MalformedField("mode")),
                };
                Ok(ClientMessage::GetClients { query })
            }
            MsgType::GetChannels => Ok(ClientMessage::GetChannels),
            MsgType::GetChatHistory => Ok(ClientMessage::GetChatHistory {
                channel_id: wire::get_u16(buf, "channel_id")?,
                count: wire::get_u16(buf, "count")?,
                offset_id: wire::get_u16(buf, "offset_id")?,
            }),
            MsgType::ChatMessage => Ok(ClientMessage::ChatMessage {
                channel_id: wire::get_u16(buf, "channel_id")?,
                content: wire::get_required_string(buf, "content")?,
            }),
            MsgType::VoiceChannelJoin => Ok(ClientMessage::VoiceChannelJoin {
                channel_id: wire::get_u16(buf, "channel_id")?,
            }),
            MsgType::VoiceChannelLeave => Ok(ClientMessage::VoiceChannelLeave {
                channel_id: wire::get_u16(buf, "channel_id")?,
            }),
            // Notifications only flow server -> client
            MsgType::ClientConnected | MsgType::ClientDisconnected => {
                Err(ProtocolError::UnknownType(ty as u8))
            }
        }
    }

    /// Encode the complete frame: length, tag, payload
    pub fn to_frame(&self) -> Result<Bytes, ProtocolError> {
        encode_frame(self.msg_type(), |dst| self.encode_payload(dst))
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Error response
    Error { code: ErrorCode, message: String },

    /// A client completed login (notification)
    ClientConnected { client_id: u16, name: String },

    /// A client disconnected (notification)
    ClientDisconnected { client_id: u16 },

    /// Connected clients matching a GetClients request
    GetClients { clients: Vec<ClientInfo> },

    /// The channel table
    GetChannels { channels: Vec<ChannelInfo> },

    /// Stored messages from one channel, in id order
    GetChatHistory {
        channel_id: u16,
        messages: Vec<ChatMessage>,
    },

    /// A chat message accepted into a channel, broadcast to all clients
    ChatMessage {
        channel_id: u16,
        message: ChatMessage,
    },

    /// Voice join acknowledgement (unused; type exists without behavior)
    VoiceChannelJoin { channel_id: u16, client_id: u16 },

    /// Voice leave acknowledgement (unused; type exists without behavior)
    VoiceChannelLeave { channel_id: u16, client_id: u16 },
}

impl ServerMessage {
    /// The wire tag for this message, read straight off the variant
    pub fn msg_type(&self) -> MsgType {
        match self {
            ServerMessage::Error { .. } => MsgType::Error,
            ServerMessage::ClientConnected { .. } => MsgType::ClientConnected,
            ServerMessage::ClientDisconnected { .. } => MsgType::ClientDisconnected,
            ServerMessage::GetClients { .. } => MsgType::GetClients,
            ServerMessage::GetChannels { .. } => MsgType::GetChannels,
            ServerMessage::GetChatHistory { .. } => MsgType::GetChatHistory,
            ServerMessage::ChatMessage { .. } => MsgType::ChatMessage,
            ServerMessage::VoiceChannelJoin { .. } => MsgType::VoiceChannelJoin,
            ServerMessage::VoiceChannelLeave { .. } => MsgType::VoiceChannelLeave,
        }
    }

    /// Encode the payload (everything after the type tag)
    pub fn encode_payload(&self, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        match self {
            ServerMessage::Error { code, message } => {
                dst.put_u16(*code as u16);
                wire::put_string(dst, message, "message")?;
            }
            ServerMessage::ClientConnected { client_id, name } => {
                dst.put_u16(*client_id);
                wire::put_string(dst, name, "name")?;
            }
            ServerMessage::ClientDisconnected { client_id } => {
                dst.put_u16(*client_id);
            }
            ServerMessage::GetClients { clients } => {
                wire::put_count(dst, clients.len(), "clients")?;
                for client in clients {
                    dst.put_u16(client.id);
                    wire::put_string(dst, &client.name, "name")?;
                }
            }
            ServerMessage::GetChannels { channels } => {
                wire::put_count(dst, channels.len(), "channels")?;
                for channel in channels {
                    dst.put_u16(channel.id);
                    dst.put_u16(channel.parent_id);
                    wire::put_string(dst, &channel.name, "name")?;
                    dst.put_u8(channel.kind as u8);
                }
            }
            ServerMessage::GetChatHistory {
                channel_id,
                messages,
            } => {
                dst.put_u16(*channel_id);
                wire::put_count(dst, messages.len(), "messages")?;
                for msg in messages {
                    put_chat_message(dst, msg)?;
                }
            }
            ServerMessage::ChatMessage {
                channel_id,
                message,
            } => {
                if message.sender_name.is_empty() {
                    return Err(ProtocolError::EmptyField("sender_name"));
                }
                if message.content.is_empty() {
                    return Err(ProtocolError::EmptyField("content"));
                }
                dst.put_u16(*channel_id);
                put_chat_message(dst, message)?;
            }
            ServerMessage::VoiceChannelJoin {
                channel_id,
                client_id,
            }
            | ServerMessage::VoiceChannelLeave {
                channel_id,
                client_id,
            } => {
                dst.put_u16(*channel_id);
                dst.put_u16(*client_id);
            }
        }
        Ok(())
    }

    /// Decode a payload for the given tag
    pub fn decode_payload(ty: MsgType, buf: &mut Bytes) -> Result<Self, ProtocolError> {
        match ty {
            MsgType::Error => Ok(ServerMessage::Error {
                code: ErrorCode::from_wire(wire::get_u16(buf, "code")?),
                message: wire::get_string(buf, "message")?,
            }),
            MsgType::ClientConnected => Ok(ServerMessage::ClientConnected {
                client_id: wire::get_u16(buf, "client_id")?,
                name: wire::get_string(buf, "name")?,
            }),
            MsgType::ClientDisconnected => Ok(ServerMessage::ClientDisconnected {
                client_id: wire::get_u16(buf, "client_id")?,
            }),
            MsgType::GetClients => {
                let count = wire::get_u16(buf, "count")?;
                let mut clients = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    clients.push(ClientInfo {
                        id: wire::get_u16(buf, "client_id")?,
                        name: wire::get_string(buf, "name")?,
                    });
                }
                Ok(ServerMessage::GetClients { clients })
            }
            MsgType::GetChannels => {
                let count = wire::get_u16(buf, "count")?;
                let mut channels = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    channels.push(ChannelInfo {
                        id: wire::get_u16(buf, "channel_id")?,
                        parent_id: wire::get_u16(buf, "parent_id")?,
                        name: wire::get_string(buf, "name")?,
                        kind: ChannelType::from_wire(wire::get_u8(buf, "type")?)
                            .ok_or(ProtocolError::MalformedField("type"))?,
                    });
                }
                Ok(ServerMessage::GetChannels { channels })
            }
            MsgType::GetChatHistory => {
                let channel_id = wire::get_u16(buf, "channel_id")?;
                let count = wire::get_u16(buf, "count")?;
                let mut messages = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    messages.push(get_chat_message(buf)?);
                }
                Ok(ServerMessage::GetChatHistory {
                    channel_id,
                    messages,
                })
            }
            MsgType::ChatMessage => Ok(ServerMessage::ChatMessage {
                channel_id: wire::get_u16(buf, "channel_id")?,
                message: get_chat_message(buf)?,
            }),
            MsgType::VoiceChannelJoin => Ok(ServerMessage::VoiceChannelJoin {
                channel_id: wire::get_u16(buf, "channel_id")?,
                client_id: wire::get_u16(buf, "client_id")?,
            }),
            MsgType::VoiceChannelLeave => Ok(ServerMessage::VoiceChannelLeave {
                channel_id: wire::get_u16(buf, "channel_id")?,
                client_id: wire::get_u16(buf, "client_id")?,
            }),
            // Login only flows client -> server
            MsgType::Login => Err(ProtocolError::UnknownType(ty as u8)),
        }
    }

    /// Encode the complete frame: length, tag, payload
    pub fn to_frame(&self) -> Result<Bytes, ProtocolError> {
        encode_frame(self.msg_type(), |dst| self.encode_payload(dst))
    }
}

fn put_chat_message(dst: &mut BytesMut, msg: &ChatMessage) -> Result<(), ProtocolError> {
    dst.put_u16(msg.message_id);
    dst.put_u16(msg.sender_id);
    wire::put_string(dst, &msg.sender_name, "sender_name")?;
    wire::put_string(dst, &msg.content, "content")?;
    Ok(())
}

fn get_chat_message(buf: &mut Bytes) -> Result<ChatMessage, ProtocolError> {
    Ok(ChatMessage {
        message_id: wire::get_u16(buf, "message_id")?,
        sender_id: wire::get_u16(buf, "sender_id")?,
        sender_name: wire::get_required_string(buf, "sender_name")?,
        content: wire::get_required_string(buf, "content")?,
    })
}

/// Assemble a complete frame around an encoded payload
fn encode_frame(
    ty: MsgType,
    encode: impl FnOnce(&mut BytesMut) -> Result<(), ProtocolError>,
) -> Result<Bytes, ProtocolError> {
    let mut payload = BytesMut::new();
    encode(&mut payload)?;

    let mut frame = BytesMut::new();
    crate::codec::encode_frame(ty, &payload, &mut frame)?;
    Ok(frame.freeze())
}
