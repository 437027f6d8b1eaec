use bytes::Bytes;
use http::HeaderMap;

use crate::protocol::{RequestHead, ResponseHead};

/// An inbound protocol event for a single connection.
///
/// The decoder produces these in wire order: exactly one `Head`, any number of
/// `BodyChunk`s, then one `End`. The [`MessageAccumulator`](crate::connection::MessageAccumulator)
/// turns a complete sequence into a [`Request`](crate::protocol::Request).
#[derive(Debug)]
pub enum RequestEvent {
    /// Start of a message: method, target, version and headers
    Head(RequestHead),
    /// A slice of body bytes, in arrival order
    BodyChunk(Bytes),
    /// Terminal event, carrying trailing headers when the body was chunked and had any
    End(Option<HeaderMap>),
}

impl RequestEvent {
    /// Returns true if this event starts a new message
    #[inline]
    pub fn is_head(&self) -> bool {
        matches!(self, RequestEvent::Head(_))
    }
}

impl From<Bytes> for RequestEvent {
    fn from(bytes: Bytes) -> Self {
        Self::BodyChunk(bytes)
    }
}

/// An outbound frame handed to the [`ResponseEncoder`](crate::codec::ResponseEncoder).
///
/// Frames must be written as `Head`, zero or more `Body`, then `End`. The head carries
/// the exact body length so the encoder can emit `content-length` framing.
#[derive(Debug)]
pub enum ResponseFrame {
    Head(ResponseHead, u64),
    Body(Bytes),
    End,
}
