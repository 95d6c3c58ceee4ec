//! WebSocket frame codec.
//!
//! Frame layout:
//!
//! ```text
//! +-+-------+-+-------------+-------------------------------+
//! |F| rsv + |M| payload len |   extended payload length     |
//! |I| opcode|A|   (7 bits)  |   (16 or 64 bits, if 126/127) |
//! |N| (4+4) |S|             |                               |
//! +-+-------+-+-------------+-------------------------------+
//! | masking key (4 bytes, if MASK set) | payload ...        |
//! +------------------------------------+--------------------+
//! ```
//!
//! Each frame is treated as one complete message. The opcode is recorded but
//! not acted on, and fragmentation and control frames are not interpreted.

use crate::error::FrameError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Text frame opcode.
pub const OPCODE_TEXT: u8 = 0x1;

const FIN_BIT: u8 = 0x80;
const MASK_BIT: u8 = 0x80;
const OPCODE_MASK: u8 = 0x0F;
const LEN_MASK: u8 = 0x7F;
const LEN_16: u8 = 126;
const LEN_64: u8 = 127;

/// A decoded (or to-be-encoded) WebSocket frame. `payload` is always the
/// unmasked application data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub opcode: u8,
    pub mask_key: Option<[u8; 4]>,
    pub payload: Bytes,
}

impl Frame {
    /// Creates a final, unmasked text frame.
    pub fn text(text: &str) -> Self {
        Self {
            fin: true,
            opcode: OPCODE_TEXT,
            mask_key: None,
            payload: Bytes::copy_from_slice(text.as_bytes()),
        }
    }

    /// Sets the masking key used when encoding, as a client would.
    pub fn with_mask(mut self, key: [u8; 4]) -> Self {
        self.mask_key = Some(key);
        self
    }

    pub fn is_masked(&self) -> bool {
        self.mask_key.is_some()
    }

    pub fn payload_len(&self) -> u64 {
        self.payload.len() as u64
    }

    /// Encodes the frame, masking the payload when a key is set.
    pub fn encode(&self) -> BytesMut {
        let len = self.payload.len();
        let mut buf = BytesMut::with_capacity(14 + len);

        let fin = if self.fin { FIN_BIT } else { 0 };
        buf.put_u8(fin | (self.opcode & OPCODE_MASK));

        let mask = if self.is_masked() { MASK_BIT } else { 0 };
        if len < LEN_16 as usize {
            buf.put_u8(mask | len as u8);
        } else if len <= u16::MAX as usize {
            buf.put_u8(mask | LEN_16);
            buf.put_u16(len as u16);
        } else {
            buf.put_u8(mask | LEN_64);
            buf.put_u64(len as u64);
        }

        match self.mask_key {
            Some(key) => {
                buf.put_slice(&key);
                let start = buf.len();
                buf.put_slice(&self.payload);
                apply_mask(&mut buf[start..], key);
            }
            None => buf.put_slice(&self.payload),
        }

        buf
    }

    /// Decodes one frame from the front of `buf`.
    ///
    /// Returns `Ok(None)` without consuming anything if the frame is not yet
    /// complete. A declared payload larger than `max_payload` is rejected as
    /// soon as the length field is readable.
    pub fn decode(buf: &mut BytesMut, max_payload: usize) -> Result<Option<Self>, FrameError> {
        if buf.len() < 2 {
            return Ok(None);
        }

        let fin = buf[0] & FIN_BIT != 0;
        let opcode = buf[0] & OPCODE_MASK;
        let masked = buf[1] & MASK_BIT != 0;

        let (declared, mut header_len) = match buf[1] & LEN_MASK {
            LEN_16 => {
                if buf.len() < 4 {
                    return Ok(None);
                }
                (u16::from_be_bytes([buf[2], buf[3]]) as u64, 4)
            }
            LEN_64 => {
                if buf.len() < 10 {
                    return Ok(None);
                }
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&buf[2..10]);
                (u64::from_be_bytes(raw), 10)
            }
            n => (n as u64, 2),
        };

        let payload_len = usize::try_from(declared)
            .ok()
            .filter(|len| *len <= max_payload)
            .ok_or(FrameError::FrameTooLarge {
                size: declared,
                max: max_payload,
            })?;

        if masked {
            header_len += 4;
        }
        if buf.len() < header_len + payload_len {
            return Ok(None);
        }

        let mask_key = masked.then(|| {
            let at = header_len - 4;
            [buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]
        });

        buf.advance(header_len);
        let mut payload = buf.split_to(payload_len);
        if let Some(key) = mask_key {
            apply_mask(&mut payload, key);
        }

        Ok(Some(Self {
            fin,
            opcode,
            mask_key,
            payload: payload.freeze(),
        }))
    }

    /// Interprets the payload as UTF-8 text.
    pub fn into_text(self) -> Result<String, FrameError> {
        String::from_utf8(self.payload.to_vec()).map_err(|_| FrameError::InvalidUtf8)
    }
}

/// XORs `data` in place with the repeating 4-byte key.
pub fn apply_mask(data: &mut [u8], key: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

/// Buffers bytes from a stream and yields complete frames.
pub struct FrameReader {
    buffer: BytesMut,
    max_payload: usize,
}

impl FrameReader {
    pub fn new(max_payload: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            max_payload,
        }
    }

    /// Reads the next frame.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly between frames and
    /// [`FrameError::Truncated`] when it ends part way through one.
    pub async fn read_frame<R>(&mut self, reader: &mut R) -> Result<Option<Frame>, FrameError>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            if let Some(frame) = Frame::decode(&mut self.buffer, self.max_payload)? {
                return Ok(Some(frame));
            }

            if reader.read_buf(&mut self.buffer).await? == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(FrameError::Truncated {
                    received: self.buffer.len(),
                });
            }
        }
    }

    /// Reads the next frame and returns its payload as text.
    pub async fn read_text<R>(&mut self, reader: &mut R) -> Result<Option<String>, FrameError>
    where
        R: AsyncRead + Unpin,
    {
        match self.read_frame(reader).await? {
            Some(frame) => frame.into_text().map(Some),
            None => Ok(None),
        }
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

/// Writes `text` as a single unmasked final text frame and flushes.
pub async fn write_text<W>(writer: &mut W, text: &str) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = Frame::text(text).encode();
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 4] = [0x37, 0xfa, 0x21, 0x3d];
    const MAX: usize = 1 << 20;

    #[test]
    fn test_short_text_frame_layout() {
        let encoded = Frame::text("hello").encode();
        assert_eq!(&encoded[..], b"\x81\x05hello");
    }

    #[test]
    fn test_empty_frame() {
        let encoded = Frame::text("").encode();
        assert_eq!(&encoded[..], &[0x81, 0x00]);

        let mut buf = encoded;
        let decoded = Frame::decode(&mut buf, MAX).unwrap().unwrap();
        assert!(decoded.payload.is_empty());
        assert!(decoded.fin);
    }

    #[test]
    fn test_length_selector_boundaries() {
        for (len, header) in [(10usize, 2usize), (125, 2), (126, 4), (200, 4), (65535, 4), (70000, 10)] {
            let text = "x".repeat(len);
            let encoded = Frame::text(&text).encode();
            assert_eq!(encoded.len(), header + len, "length {}", len);

            let mut buf = encoded;
            let decoded = Frame::decode(&mut buf, MAX).unwrap().unwrap();
            assert_eq!(decoded.payload_len(), len as u64);
            assert!(buf.is_empty());
        }

        let encoded = Frame::text(&"x".repeat(200)).encode();
        assert_eq!(&encoded[..4], &[0x81, 126, 0x00, 200]);

        let encoded = Frame::text(&"x".repeat(70000)).encode();
        assert_eq!(encoded[1], 127);
        assert_eq!(&encoded[2..10], &70000u64.to_be_bytes());
    }

    #[test]
    fn test_masked_client_frame() {
        // "Hello" masked with the sample key.
        let mut buf = BytesMut::from(&[0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58][..]);
        let frame = Frame::decode(&mut buf, MAX).unwrap().unwrap();
        assert!(frame.is_masked());
        assert_eq!(frame.mask_key, Some(KEY));
        assert_eq!(frame.into_text().unwrap(), "Hello");
    }

    #[test]
    fn test_masked_encode_matches_sample() {
        let encoded = Frame::text("Hello").with_mask(KEY).encode();
        assert_eq!(
            &encoded[..],
            &[0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58]
        );
    }

    #[test]
    fn test_opcode_recorded_not_validated() {
        let mut buf = BytesMut::from(&[0x0A, 0x02, b'o', b'k'][..]);
        let frame = Frame::decode(&mut buf, MAX).unwrap().unwrap();
        assert!(!frame.fin);
        assert_eq!(frame.opcode, 0x0A);
        assert_eq!(frame.payload.as_ref(), b"ok");
    }

    #[test]
    fn test_incomplete_frames_consume_nothing() {
        let encoded = Frame::text(&"y".repeat(300)).with_mask(KEY).encode();
        for cut in [1, 3, 7, encoded.len() - 1] {
            let mut partial = BytesMut::from(&encoded[..cut]);
            assert!(Frame::decode(&mut partial, MAX).unwrap().is_none());
            assert_eq!(partial.len(), cut);
        }
    }

    #[test]
    fn test_oversized_declared_length() {
        let mut buf = BytesMut::new();
        buf.put_u8(0x81);
        buf.put_u8(LEN_64);
        buf.put_u64(u64::MAX);
        assert!(matches!(
            Frame::decode(&mut buf, MAX),
            Err(FrameError::FrameTooLarge { size: u64::MAX, .. })
        ));

        let mut buf = Frame::text(&"z".repeat(64)).encode();
        assert!(matches!(
            Frame::decode(&mut buf, 63),
            Err(FrameError::FrameTooLarge { size: 64, max: 63 })
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let frame = Frame {
            fin: true,
            opcode: OPCODE_TEXT,
            mask_key: None,
            payload: Bytes::from_static(&[0xC3, 0x28]),
        };
        assert!(matches!(frame.into_text(), Err(FrameError::InvalidUtf8)));
    }

    #[tokio::test]
    async fn test_reader_yields_frames_then_eof() {
        let mut data = Frame::text("first").with_mask(KEY).encode().to_vec();
        data.extend_from_slice(&Frame::text("second").with_mask([1, 2, 3, 4]).encode());
        let mut stream = &data[..];

        let mut reader = FrameReader::new(MAX);
        assert_eq!(reader.read_text(&mut stream).await.unwrap().as_deref(), Some("first"));
        assert_eq!(reader.read_text(&mut stream).await.unwrap().as_deref(), Some("second"));
        assert_eq!(reader.read_text(&mut stream).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reader_truncated_frame() {
        let encoded = Frame::text("cut short").encode();
        let mut stream = &encoded[..encoded.len() - 2];

        let mut reader = FrameReader::new(MAX);
        let result = reader.read_frame(&mut stream).await;
        assert!(matches!(result, Err(FrameError::Truncated { received: 9 })));
    }

    #[tokio::test]
    async fn test_reader_across_split_reads() {
        let encoded = Frame::text(&"w".repeat(1000)).with_mask(KEY).encode();
        let mock = tokio_test::io::Builder::new()
            .read(&encoded[..3])
            .read(&encoded[3..500])
            .read(&encoded[500..])
            .build();
        let mut stream = mock;

        let mut reader = FrameReader::new(MAX);
        let text = reader.read_text(&mut stream).await.unwrap().unwrap();
        assert_eq!(text.len(), 1000);
        assert_eq!(reader.buffered(), 0);
    }

    #[tokio::test]
    async fn test_write_text_single_frame() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        write_text(&mut server, r#"{"success":true}"#).await.unwrap();
        drop(server);

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert_eq!(received[0], 0x81);
        assert_eq!(received[1] as usize, received.len() - 2);
        assert_eq!(&received[2..], br#"{"success":true}"#);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn masked_roundtrip(payload in proptest::collection::vec(any::<u8>(), 0..70_000), key in any::<[u8; 4]>()) {
                let frame = Frame {
                    fin: true,
                    opcode: OPCODE_TEXT,
                    mask_key: Some(key),
                    payload: Bytes::from(payload.clone()),
                };
                let mut buf = frame.encode();
                let decoded = Frame::decode(&mut buf, MAX).unwrap().unwrap();
                prop_assert_eq!(decoded.payload.as_ref(), payload.as_slice());
                prop_assert!(buf.is_empty());
            }
        }
    }
}
