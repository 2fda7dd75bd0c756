//! Length-prefixed frame codec.
//!
//! Frames are a 4-byte big-endian length prefix followed by the payload.
//! The length is validated against the configured cap before any payload
//! allocation happens, so a hostile prefix cannot exhaust memory.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::error::{ProtocolError, MAX_FRAME_SIZE};

/// Length of the frame length prefix in bytes.
const LENGTH_PREFIX_SIZE: usize = 4;

/// Codec for length-prefixed frames over a byte stream.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    /// Creates a codec with the default frame cap ([`MAX_FRAME_SIZE`]).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    /// Creates a codec with a custom frame cap.
    #[must_use]
    pub const fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Returns the configured frame cap.
    #[must_use]
    pub const fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, ProtocolError> {
        if src.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        prefix.copy_from_slice(&src[..LENGTH_PREFIX_SIZE]);
        let len = u32::from_be_bytes(prefix) as usize;

        if len > self.max_frame_size {
            return Err(ProtocolError::frame_too_large(len, self.max_frame_size));
        }

        if src.len() < LENGTH_PREFIX_SIZE + len {
            src.reserve(LENGTH_PREFIX_SIZE + len - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX_SIZE);
        Ok(Some(src.split_to(len).freeze()))
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        if item.len() > self.max_frame_size {
            return Err(ProtocolError::frame_too_large(
                item.len(),
                self.max_frame_size,
            ));
        }
        let len = u32::try_from(item.len())
            .map_err(|_| ProtocolError::frame_too_large(item.len(), self.max_frame_size))?;

        dst.reserve(LENGTH_PREFIX_SIZE + item.len());
        dst.put_u32(len);
        dst.extend_from_slice(&item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();

        codec
            .encode(Bytes::from_static(b"hello"), &mut buf)
            .expect("encode failed");
        assert_eq!(&buf[..4], &[0, 0, 0, 5]);

        let frame = codec.decode(&mut buf).expect("decode failed").unwrap();
        assert_eq!(&frame[..], b"hello");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_waits_for_complete_frame() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0u8, 0, 0, 5, b'h', b'e'][..]);

        assert!(codec.decode(&mut buf).expect("decode failed").is_none());

        buf.extend_from_slice(b"llo");
        let frame = codec.decode(&mut buf).expect("decode failed").unwrap();
        assert_eq!(&frame[..], b"hello");
    }

    #[test]
    fn test_decode_rejects_oversized_prefix_before_allocation() {
        let mut codec = FrameCodec::new();
        // Length prefix claims u32::MAX bytes with no payload behind it.
        let mut buf = BytesMut::from(&[0xff_u8, 0xff, 0xff, 0xff][..]);

        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { .. }));
    }

    #[test]
    fn test_encode_rejects_oversized_frame() {
        let mut codec = FrameCodec::with_max_frame_size(8);
        let mut buf = BytesMut::new();

        let err = codec
            .encode(Bytes::from_static(b"way too long"), &mut buf)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { .. }));
    }

    #[test]
    fn test_decode_multiple_frames_in_one_buffer() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode(Bytes::from_static(b"one"), &mut buf)
            .expect("encode failed");
        codec
            .encode(Bytes::from_static(b"two"), &mut buf)
            .expect("encode failed");

        let first = codec.decode(&mut buf).expect("decode failed").unwrap();
        let second = codec.decode(&mut buf).expect("decode failed").unwrap();
        assert_eq!(&first[..], b"one");
        assert_eq!(&second[..], b"two");
        assert!(codec.decode(&mut buf).expect("decode failed").is_none());
    }
}
