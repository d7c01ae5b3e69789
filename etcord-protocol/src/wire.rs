//! Low-level wire field readers and writers
//!
//! All numeric fields are big-endian. Strings are raw UTF-8 bytes followed
//! by a single 0x00 terminator; lists are prefixed with a u16 element count.
//! Every reader names the field it was reading so decode errors point at the
//! offending field rather than a byte offset.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

pub fn get_u8(buf: &mut Bytes, field: &'static str) -> Result<u8, ProtocolError> {
    if buf.remaining() < 1 {
        return Err(ProtocolError::MalformedField(field));
    }
    Ok(buf.get_u8())
}

pub fn get_u16(buf: &mut Bytes, field: &'static str) -> Result<u16, ProtocolError> {
    if buf.remaining() < 2 {
        return Err(ProtocolError::MalformedField(field));
    }
    Ok(buf.get_u16())
}

/// Read a NUL-terminated UTF-8 string.
///
/// A missing terminator is a malformed field: the stream position can no
/// longer be trusted for subsequent fields.
pub fn get_string(buf: &mut Bytes, field: &'static str) -> Result<String, ProtocolError> {
    let Some(nul) = buf.iter().position(|&b| b == 0) else {
        return Err(ProtocolError::MalformedField(field));
    };
    let raw = buf.split_to(nul);
    buf.advance(1); // terminator
    String::from_utf8(raw.to_vec()).map_err(|_| ProtocolError::InvalidUtf8(field))
}

/// Read a NUL-terminated string that must be non-empty.
pub fn get_required_string(
    buf: &mut Bytes,
    field: &'static str,
) -> Result<String, ProtocolError> {
    let s = get_string(buf, field)?;
    if s.is_empty() {
        return Err(ProtocolError::EmptyField(field));
    }
    Ok(s)
}

/// Write a NUL-terminated string, rejecting content that contains NUL.
pub fn put_string(
    dst: &mut BytesMut,
    s: &str,
    field: &'static str,
) -> Result<(), ProtocolError> {
    if s.as_bytes().contains(&0) {
        return Err(ProtocolError::NulInString(field));
    }
    dst.put_slice(s.as_bytes());
    dst.put_u8(0);
    Ok(())
}

/// Read a count-prefixed list of u16 ids.
pub fn get_id_list(buf: &mut Bytes, field: &'static str) -> Result<Vec<u16>, ProtocolError> {
    let count = get_u16(buf, field)?;
    let mut ids = Vec::with_capacity(count as usize);
    for _ in 0..count {
        ids.push(get_u16(buf, field)?);
    }
    Ok(ids)
}

/// Write a count-prefixed list of u16 ids.
pub fn put_id_list(
    dst: &mut BytesMut,
    ids: &[u16],
    field: &'static str,
) -> Result<(), ProtocolError> {
    let count = u16::try_from(ids.len()).map_err(|_| ProtocolError::ListTooLong(field))?;
    dst.put_u16(count);
    for &id in ids {
        dst.put_u16(id);
    }
    Ok(())
}

/// Write a u16 element count for a list of `len` entries.
pub fn put_count(
    dst: &mut BytesMut,
    len: usize,
    field: &'static str,
) -> Result<(), ProtocolError> {
    let count = u16::try_from(len).map_err(|_| ProtocolError::ListTooLong(field))?;
    dst.put_u16(count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes_of(v: &[u8]) -> Bytes {
        Bytes::copy_from_slice(v)
    }

    #[test]
    fn test_u16_big_endian() {
        let mut buf = bytes_of(&[0x01, 0x02]);
        assert_eq!(get_u16(&mut buf, "x").unwrap(), 0x0102);
    }

    #[test]
    fn test_u16_insufficient_bytes() {
        let mut buf = bytes_of(&[0x01]);
        assert!(matches!(
            get_u16(&mut buf, "x"),
            Err(ProtocolError::MalformedField("x"))
        ));
    }

    #[test]
    fn test_string_roundtrip() {
        let mut dst = BytesMut::new();
        put_string(&mut dst, "ada", "name").unwrap();
        assert_eq!(&dst[..], &[0x61, 0x64, 0x61, 0x00]);

        let mut buf = dst.freeze();
        assert_eq!(get_string(&mut buf, "name").unwrap(), "ada");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_string_missing_terminator() {
        let mut buf = bytes_of(b"ada");
        assert!(matches!(
            get_string(&mut buf, "name"),
            Err(ProtocolError::MalformedField("name"))
        ));
    }

    #[test]
    fn test_string_with_nul_rejected_on_encode() {
        let mut dst = BytesMut::new();
        assert!(matches!(
            put_string(&mut dst, "a\0b", "content"),
            Err(ProtocolError::NulInString("content"))
        ));
    }

    #[test]
    fn test_required_string_empty() {
        let mut buf = bytes_of(&[0x00]);
        assert!(matches!(
            get_required_string(&mut buf, "name"),
            Err(ProtocolError::EmptyField("name"))
        ));
    }

    #[test]
    fn test_id_list_roundtrip() {
        let mut dst = BytesMut::new();
        put_id_list(&mut dst, &[7, 65535], "client_ids").unwrap();
        assert_eq!(&dst[..], &[0x00, 0x02, 0x00, 0x07, 0xff, 0xff]);

        let mut buf = dst.freeze();
        assert_eq!(get_id_list(&mut buf, "client_ids").unwrap(), vec![7, 65535]);
    }

    #[test]
    fn test_id_list_truncated() {
        // Count says two entries, only one present
        let mut buf = bytes_of(&[0x00, 0x02, 0x00, 0x07]);
        assert!(matches!(
            get_id_list(&mut buf, "client_ids"),
            Err(ProtocolError::MalformedField("client_ids"))
        ));
    }
}
