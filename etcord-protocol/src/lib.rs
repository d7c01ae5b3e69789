//! etcord-protocol: Shared wire definitions for client-server communication
//!
//! This crate defines all message types and the binary framing codec used
//! for communication between etcord clients and the server over TCP.
//!
//! A frame on the wire is `LENGTH(u16 BE) TYPE(u8) PAYLOAD(LENGTH-1 bytes)`.
//! Numeric fields are big-endian, strings are NUL-terminated UTF-8, and
//! lists are count-prefixed. Request and response share a type tag; the
//! direction is inferred from the connection role ([`ServerCodec`] decodes
//! requests and encodes responses, [`ClientCodec`] the inverse).

pub mod codec;
pub mod error;
pub mod messages;
pub mod types;
mod wire;

// Re-export main types at crate root
pub use codec::{ClientCodec, FrameCodec, ServerCodec, FRAME_HEADER_LEN, MAX_PAYLOAD_LEN};
pub use error::ProtocolError;
pub use messages::{ClientMessage, ClientQuery, ErrorCode, MsgType, ServerMessage};
pub use types::{ChannelInfo, ChannelType, ChatMessage, ClientInfo};
