//! Encoder and decoder for backend frames and messages.

use crate::error::ProtocolError;
use crate::frame::Frame;
use crate::message::{Request, Response};
use bytes::BytesMut;

/// Encodes requests and responses into frames.
pub struct Encoder;

impl Encoder {
    /// Encodes a request into a frame.
    pub fn encode_request(request: &Request) -> Result<BytesMut, ProtocolError> {
        Frame::from_json(request)?.encode()
    }

    /// Encodes a response into a frame.
    pub fn encode_response(response: &Response) -> Result<BytesMut, ProtocolError> {
        Frame::from_json(response)?.encode()
    }
}

/// Accumulates bytes from a stream and yields complete messages.
pub struct Decoder {
    buffer: BytesMut,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next frame from the buffer.
    pub fn decode_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        Frame::decode(&mut self.buffer)
    }

    /// Attempts to decode the next request from the buffer.
    pub fn decode_request(&mut self) -> Result<Option<Request>, ProtocolError> {
        self.decode_json()
    }

    /// Attempts to decode the next response from the buffer.
    pub fn decode_response(&mut self) -> Result<Option<Response>, ProtocolError> {
        self.decode_json()
    }

    fn decode_json<T: serde::de::DeserializeOwned>(&mut self) -> Result<Option<T>, ProtocolError> {
        match self.decode_frame()? {
            Some(frame) => {
                let payload =
                    std::str::from_utf8(&frame.payload).map_err(|_| ProtocolError::InvalidUtf8)?;
                Ok(Some(serde_json::from_str(payload)?))
            }
            None => Ok(None),
        }
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
