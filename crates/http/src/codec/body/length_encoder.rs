use crate::protocol::SendError;
use bytes::{Bytes, BytesMut};
use tokio_util::codec::Encoder;

/// Writes a body whose length was announced in the `content-length` header.
///
/// Rejects chunks that would overrun the announced length; [`LengthEncoder::is_finish`]
/// tells the caller whether the body is short.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    length: u64,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { length }
    }

    /// Returns true once every announced byte has been written
    #[inline]
    pub fn is_finish(&self) -> bool {
        self.length == 0
    }
}

impl Encoder<Bytes> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, bytes: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if bytes.is_empty() {
            return Ok(());
        }

        let len = bytes.len() as u64;
        if len > self.length {
            return Err(SendError::invalid_frame(format!("body chunk of {len} bytes exceed the remaining length {}", self.length)));
        }

        dst.extend_from_slice(&bytes);
        self.length -= len;
        Ok(())
    }
}
