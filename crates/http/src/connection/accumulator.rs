use bytes::BytesMut;
use http::HeaderMap;
use tracing::trace;

use crate::protocol::{ProtocolError, Request, RequestEvent, RequestHead};

/// Default upper bound for an accumulated request body, 8 MiB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 8 * 1024 * 1024;

/// Assembles one connection's `Head`, `BodyChunk*`, `End` events into [`Request`]s.
///
/// Body bytes are collected in a scratch buffer owned by the accumulator and only
/// handed to the request when `End` arrives. The buffer keeps its capacity between
/// requests on a persistent connection.
///
/// Any out-of-order event is a [`ProtocolError`], after which the accumulator is reset
/// and the connection is expected to close.
#[derive(Debug)]
pub struct MessageAccumulator {
    head: Option<RequestHead>,
    scratch: BytesMut,
    body_seen: bool,
    max_body_size: usize,
}

impl Default for MessageAccumulator {
    fn default() -> Self {
        Self::with_max_body_size(DEFAULT_MAX_BODY_SIZE)
    }
}

impl MessageAccumulator {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_max_body_size(max_body_size: usize) -> Self {
        Self { head: None, scratch: BytesMut::new(), body_seen: false, max_body_size }
    }

    /// Feeds one event, returning the completed request when `event` is `End`.
    pub fn accumulate(&mut self, event: RequestEvent) -> Result<Option<Request>, ProtocolError> {
        match event {
            RequestEvent::Head(head) => self.on_head(head).map(|()| None),
            RequestEvent::BodyChunk(bytes) => self.on_body_chunk(&bytes).map(|()| None),
            RequestEvent::End(trailers) => self.on_end(trailers).map(Some),
        }
    }

    pub fn on_head(&mut self, head: RequestHead) -> Result<(), ProtocolError> {
        if self.head.is_some() {
            self.reset();
            return Err(ProtocolError::HeadWhileInFlight);
        }

        trace!(method = %head.method(), uri = %head.uri(), "accepted request head");
        self.scratch.clear();
        self.body_seen = false;
        self.head = Some(head);
        Ok(())
    }

    pub fn on_body_chunk(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        if self.head.is_none() {
            self.reset();
            return Err(ProtocolError::BodyWithoutHead);
        }

        let size = self.scratch.len() + bytes.len();
        if size > self.max_body_size {
            self.reset();
            return Err(ProtocolError::BodyTooLarge { size, max_size: self.max_body_size });
        }

        self.scratch.extend_from_slice(bytes);
        self.body_seen = true;
        Ok(())
    }

    /// Completes the in-flight request.
    ///
    /// The body is `None` when no `BodyChunk` arrived, and `Some` (possibly empty) otherwise.
    pub fn on_end(&mut self, trailers: Option<HeaderMap>) -> Result<Request, ProtocolError> {
        let Some(head) = self.head.take() else {
            self.reset();
            return Err(ProtocolError::EndWithoutHead);
        };

        let body = self.body_seen.then(|| self.scratch.split().freeze());
        self.body_seen = false;

        Ok(Request::new(head, body, trailers))
    }

    /// True when no request is in progress
    pub fn is_idle(&self) -> bool {
        self.head.is_none()
    }

    /// Drops any in-flight head and body bytes.
    pub fn reset(&mut self) {
        self.head = None;
        self.scratch.clear();
        self.body_seen = false;
    }
}
