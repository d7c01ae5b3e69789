//! Frame codec for the etcord wire protocol
//!
//! A frame is `LENGTH(u16 BE) TYPE(u8) PAYLOAD(LENGTH-1 bytes)`; the length
//! counts the tag plus payload. Frames are self-delimiting, a stream is
//! frames concatenated. The decoder buffers partial trailing bytes until the
//! next read, so a single read may yield zero, one, or many messages and a
//! frame may be split at any byte boundary.
//!
//! Once a length or tag field is misread there is no way to resynchronize
//! with the stream; those errors are connection-fatal. An invalid string
//! field inside an otherwise complete frame only poisons that one message
//! (see [`ProtocolError::is_fatal`]).

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;
use crate::messages::{ClientMessage, MsgType, ServerMessage};

/// Length-field bytes preceding every frame
pub const FRAME_HEADER_LEN: usize = 2;

/// Maximum payload size: the u16 length field minus the tag byte
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize - 1;

/// Extract one complete frame, or None if more bytes are needed
fn decode_frame(src: &mut BytesMut) -> Result<Option<(MsgType, Bytes)>, ProtocolError> {
    if src.len() < FRAME_HEADER_LEN {
        return Ok(None);
    }

    // Peek at the length without consuming
    let len = u16::from_be_bytes([src[0], src[1]]) as usize;

    // The minimum frame body is the type tag itself
    if len == 0 {
        return Err(ProtocolError::EmptyFrame);
    }

    if src.len() < FRAME_HEADER_LEN + len {
        // Reserve space for the rest of the frame
        src.reserve(FRAME_HEADER_LEN + len - src.len());
        return Ok(None);
    }

    src.advance(FRAME_HEADER_LEN);
    let mut body = src.split_to(len).freeze();

    let tag = body.get_u8();
    let ty = MsgType::try_from(tag)?;
    Ok(Some((ty, body)))
}

/// Append a complete frame for an already encoded payload
pub(crate) fn encode_frame(
    ty: MsgType,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<(), ProtocolError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::FrameTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    dst.reserve(FRAME_HEADER_LEN + 1 + payload.len());
    dst.put_u16(1 + payload.len() as u16);
    dst.put_u8(ty as u8);
    dst.put_slice(payload);
    Ok(())
}

/// Frame-level codec: extracts the tag and raw payload of each frame
/// without interpreting the payload.
///
/// Connection loops use this instead of a message-level codec so that a
/// request-local payload error (an empty required string) does not
/// terminate the framed stream: the frame is already consumed when
/// [`ClientMessage::decode_payload`] runs, and the loop decides whether
/// the error is fatal.
#[derive(Debug, Default)]
pub struct FrameCodec;

impl FrameCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for FrameCodec {
    type Item = (MsgType, Bytes);
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src)
    }
}

/// Codec for the server side: decodes requests, encodes responses
#[derive(Debug, Default)]
pub struct ServerCodec;

impl ServerCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for ServerCodec {
    type Item = ClientMessage;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some((ty, mut payload)) = decode_frame(src)? else {
            return Ok(None);
        };
        ClientMessage::decode_payload(ty, &mut payload).map(Some)
    }
}

impl Encoder<ServerMessage> for ServerCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: ServerMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut payload = BytesMut::new();
        item.encode_payload(&mut payload)?;
        encode_frame(item.msg_type(), &payload, dst)
    }
}

/// Codec for the client side: encodes requests, decodes responses
#[derive(Debug, Default)]
pub struct ClientCodec;

impl ClientCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for ClientCodec {
    type Item = ServerMessage;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some((ty, mut payload)) = decode_frame(src)? else {
            return Ok(None);
        };
        ServerMessage::decode_payload(ty, &mut payload).map(Some)
    }
}

impl Encoder<ClientMessage> for ClientCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: ClientMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut payload = BytesMut::new();
        item.encode_payload(&mut payload)?;
        encode_frame(item.msg_type(), &payload, dst)
    }
}
