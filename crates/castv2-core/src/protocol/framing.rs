//! Length-prefixed framing over the raw byte stream.
//!
//! Every frame is a 4-byte big-endian unsigned length followed by exactly
//! that many bytes of CastMessage body. A single read may carry zero, one,
//! or many complete frames plus a trailing partial; `FrameBuffer` hides all
//! of that from the decode loop.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{CastError, Result};
use crate::protocol::envelope::Envelope;
use crate::protocol::wire;

/// Length prefix size.
pub const HEADER_LEN: usize = 4;

/// Frame limit applied when no configured value is supplied.
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

/// Serialize an envelope into one wire frame. The length field is computed
/// from the serialized body, never tracked independently.
pub fn encode_frame(env: &Envelope) -> Result<Bytes> {
    let body = wire::encode_envelope(env)?;
    let mut out = BytesMut::with_capacity(HEADER_LEN + body.len());
    out.put_u32(body.len() as u32);
    out.put_slice(&body);
    Ok(out.freeze())
}

/// Connection-scoped read buffer. Owned exclusively by the transport.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: BytesMut,
    max_frame_len: usize,
}

impl FrameBuffer {
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_frame_len,
        }
    }

    /// Append one raw read.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.put_slice(chunk);
    }

    /// Pop the next complete frame body, or `None` if the buffered bytes end
    /// in a partial frame. A length prefix beyond `max_frame_len` is treated
    /// as stream corruption and is connection-fatal.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>> {
        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }
        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&self.buf[..HEADER_LEN]);
        let len = u32::from_be_bytes(header) as usize;
        if len > self.max_frame_len {
            return Err(CastError::Frame(format!(
                "frame length {len} exceeds limit {}",
                self.max_frame_len
            )));
        }
        if self.buf.len() < HEADER_LEN + len {
            return Ok(None);
        }
        self.buf.advance(HEADER_LEN);
        Ok(Some(self.buf.split_to(len).freeze()))
    }

    /// Buffered bytes not yet consumed as frames.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}
