//! HTTP request types.
//!
//! [`RequestHead`] wraps the standard `http::Request<()>` produced by the header decoder.
//! [`Request`] is the immutable value the accumulator emits once a message is complete:
//! the head, the collected body (if any body bytes were sent) and the trailing headers.

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri, Version, header};
use serde::de::DeserializeOwned;

use crate::protocol::DecodeError;

/// Represents the head of an HTTP request: method, target, version and headers.
///
/// Headers keep every occurrence of a repeated field and compare names
/// case-insensitively, as `http::HeaderMap` does.
#[derive(Debug)]
pub struct RequestHead {
    inner: http::Request<()>,
}

impl AsRef<http::Request<()>> for RequestHead {
    fn as_ref(&self) -> &http::Request<()> {
        &self.inner
    }
}

impl AsMut<http::Request<()>> for RequestHead {
    fn as_mut(&mut self) -> &mut http::Request<()> {
        &mut self.inner
    }
}

impl RequestHead {
    /// Consumes the head and returns the inner `http::Request<()>`.
    pub fn into_inner(self) -> http::Request<()> {
        self.inner
    }

    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns a reference to the request's URI.
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// Returns the request's HTTP version.
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// Returns a reference to the request's headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Whether the client asked for a persistent connection.
    ///
    /// HTTP/1.1 is persistent unless a `connection: close` token is present.
    /// HTTP/1.0 is persistent only with an explicit `connection: keep-alive` token.
    pub fn keep_alive(&self) -> bool {
        let mut close = false;
        let mut keep_alive = false;

        for value in self.headers().get_all(header::CONNECTION) {
            for token in value.as_bytes().split(|b| *b == b',') {
                let token = token.trim_ascii();
                if token.eq_ignore_ascii_case(b"close") {
                    close = true;
                } else if token.eq_ignore_ascii_case(b"keep-alive") {
                    keep_alive = true;
                }
            }
        }

        match self.version() {
            Version::HTTP_11 => !close,
            Version::HTTP_10 => keep_alive && !close,
            _ => false,
        }
    }

    /// Whether the client waits for an interim `100 Continue` before sending the body.
    ///
    /// The expectation is ignored on HTTP/1.0 requests.
    pub fn expect_continue(&self) -> bool {
        self.version() == Version::HTTP_11
            && self
                .headers()
                .get(header::EXPECT)
            .is_some_and(|value| value.as_bytes().eq_ignore_ascii_case(b"100-continue"))
    }
}

/// Converts request parts into a `RequestHead`.
impl From<Parts> for RequestHead {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: http::Request::from_parts(parts, ()) }
    }
}

/// Converts a bodyless request into a `RequestHead`.
impl From<http::Request<()>> for RequestHead {
    #[inline]
    fn from(inner: http::Request<()>) -> Self {
        Self { inner }
    }
}

/// A fully assembled HTTP request.
///
/// `body` is `None` when the client sent no body bytes at all, and `Some` (possibly empty)
/// once any body chunk was observed. Trailing headers are present only when the
/// terminal event carried them.
#[derive(Debug)]
pub struct Request {
    head: RequestHead,
    body: Option<Bytes>,
    trailers: Option<HeaderMap>,
}

impl Request {
    pub fn new(head: RequestHead, body: Option<Bytes>, trailers: Option<HeaderMap>) -> Self {
        Self { head, body, trailers }
    }

    pub fn head(&self) -> &RequestHead {
        &self.head
    }

    pub fn method(&self) -> &Method {
        self.head.method()
    }

    pub fn uri(&self) -> &Uri {
        self.head.uri()
    }

    pub fn version(&self) -> Version {
        self.head.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.head.headers()
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn trailers(&self) -> Option<&HeaderMap> {
        self.trailers.as_ref()
    }

    pub fn keep_alive(&self) -> bool {
        self.head.keep_alive()
    }

    /// Decodes the body as JSON into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::NoBody`] when the request carried no body bytes, and
    /// [`DecodeError::Json`] when the bytes do not match the shape of `T`.
    pub fn decode_body<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        match &self.body {
            Some(bytes) if !bytes.is_empty() => Ok(serde_json::from_slice(bytes)?),
            _ => Err(DecodeError::NoBody),
        }
    }

    pub fn into_parts(self) -> (RequestHead, Option<Bytes>, Option<HeaderMap>) {
        (self.head, self.body, self.trailers)
    }
}
