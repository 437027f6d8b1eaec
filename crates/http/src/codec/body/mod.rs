//! HTTP body framing.
//!
//! # Components
//!
//! ## Decoders
//! - [`ChunkedDecoder`]: Handles chunked transfer encoded payloads, including trailers
//! - [`LengthDecoder`]: Processes fixed-length payloads
//! - [`PayloadDecoder`]: Main decoder that picks one of the above from the request head
//!
//! ## Encoders
//! - [`LengthEncoder`]: Writes a fixed-length payload and tracks how much is still owed
//!
//! Responses are always framed with `content-length`, so there is no chunked encoder.

mod chunked_decoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;

pub use length_encoder::LengthEncoder;
pub use payload_decoder::PayloadDecoder;

use bytes::Bytes;
use http::HeaderMap;

/// An item produced by the payload decoders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem {
    /// A chunk of payload data
    Chunk(Bytes),
    /// End of the payload, with trailers if the chunked body carried any
    Eof(Option<HeaderMap>),
}

#[cfg(test)]
impl PayloadItem {
    /// Returns true if this item represents the end of the payload stream
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof(_))
    }

    /// Returns true if this item contains chunk data
    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }

    /// Returns a reference to the contained bytes if this is a Chunk
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof(_) => None,
        }
    }
}

/// How the body of a request is framed on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with known length in bytes
    Length(u64),
    /// Payload using chunked transfer encoding
    Chunked,
    /// Empty payload (no body)
    Empty,
}

#[cfg(test)]
impl PayloadSize {
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }
}

impl From<PayloadSize> for PayloadDecoder {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(size) => PayloadDecoder::fix_length(size),
            PayloadSize::Chunked => PayloadDecoder::chunked(),
            PayloadSize::Empty => PayloadDecoder::empty(),
        }
    }
}
