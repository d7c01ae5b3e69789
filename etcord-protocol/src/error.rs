//! Protocol error taxonomy
//!
//! Errors fall in two classes: connection-fatal (framing or field alignment
//! with the byte stream is lost, the only safe recovery is closing the
//! socket) and request-local (the frame was consumed cleanly but its content
//! is invalid, so the single message is rejected and the connection lives).

/// Protocol codec error
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The length field is zero; a frame carries at least the type tag.
    #[error("invalid frame length 0")]
    EmptyFrame,

    /// Encoded payload would overflow the u16 length field.
    #[error("frame payload too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("unknown message type tag {0}")]
    UnknownType(u8),

    /// A fixed-width field or string terminator could not be read.
    #[error("malformed field '{0}': insufficient bytes")]
    MalformedField(&'static str),

    #[error("field '{0}' is not valid UTF-8")]
    InvalidUtf8(&'static str),

    /// A required string field was empty.
    #[error("required field '{0}' is empty")]
    EmptyField(&'static str),

    /// NUL-terminated encoding cannot represent content containing NUL.
    #[error("field '{0}' contains a NUL byte")]
    NulInString(&'static str),

    /// A count-prefixed list exceeds the u16 count field.
    #[error("list field '{0}' too long for wire format")]
    ListTooLong(&'static str),
}

impl ProtocolError {
    /// Whether this error must terminate the connection.
    ///
    /// Validation failures leave the stream framing intact: the whole frame
    /// was consumed before its content was checked, so only that message is
    /// rejected. Everything else means framing alignment cannot be trusted.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ProtocolError::EmptyField(_)
                | ProtocolError::NulInString(_)
                | ProtocolError::InvalidUtf8(_)
        )
    }
}
