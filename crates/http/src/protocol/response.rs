//! HTTP response model.
//!
//! A [`Response`] is built by a controller or by the error transform, then consumed
//! exactly once by the [`ConnectionWriter`](crate::connection::ConnectionWriter).
//! [`ResponseHead`] is the header portion handed to the encoder, using
//! `http::Response<()>` with an empty body placeholder.

use bytes::Bytes;
use http::header::{self, HeaderName};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::Serialize;
use tracing::error;

use crate::protocol::InvalidStatus;

/// Type alias for HTTP response headers.
pub type ResponseHead = http::Response<()>;

/// A status code, header set, optional trailers and a fully buffered body.
///
/// Headers stay mutable until the writer takes the response. Typed constructors apply
/// a `content-type` default, which any later [`Response::header`] call replaces.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    trailers: Option<HeaderMap>,
    body: Bytes,
}

impl Response {
    /// A response with the given status, no headers and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self { status, headers: HeaderMap::new(), trailers: None, body: Bytes::new() }
    }

    pub fn with_body(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self { body: body.into(), ..Self::new(status) }
    }

    /// Builds a response from a raw integer status.
    ///
    /// # Errors
    ///
    /// Fails when `code` is not a valid status or has no registered reason phrase.
    pub fn from_status_code(code: u16) -> Result<Self, InvalidStatus> {
        Ok(Self::new(status_from_u16(code)?))
    }

    /// A plain text response with a `text/plain; charset=utf-8` content type.
    pub fn text(status: StatusCode, text: impl Into<String>) -> Self {
        let mut response = Self::with_body(status, text.into());
        response.default_content_type(mime::TEXT_PLAIN_UTF_8.as_ref());
        response
    }

    /// A response whose body is `value` encoded as JSON.
    ///
    /// Falls back to a bare `500 Internal Server Error` when `value` can't be encoded.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                let mut response = Self::with_body(status, bytes);
                response.default_content_type(mime::APPLICATION_JSON.as_ref());
                response
            }
            Err(e) => {
                error!(cause = %e, "failed to encode response body as json");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Sets a header, replacing every earlier value for the same name.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn trailer(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.trailers.get_or_insert_with(HeaderMap::new).insert(name, value);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn status_mut(&mut self) -> &mut StatusCode {
        &mut self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn trailers(&self) -> Option<&HeaderMap> {
        self.trailers.as_ref()
    }

    pub fn set_trailers(&mut self, trailers: Option<HeaderMap>) {
        self.trailers = trailers;
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Splits the response into the head written by the encoder, the body and trailers.
    pub fn into_parts(self) -> (ResponseHead, Bytes, Option<HeaderMap>) {
        let mut head = ResponseHead::new(());
        *head.status_mut() = self.status;
        *head.headers_mut() = self.headers;
        (head, self.body, self.trailers)
    }

    fn default_content_type(&mut self, value: &'static str) {
        if !self.headers.contains_key(header::CONTENT_TYPE) {
            self.headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(value));
        }
    }
}

/// Maps a raw status integer onto a `StatusCode` that has a canonical reason phrase.
pub(crate) fn status_from_u16(code: u16) -> Result<StatusCode, InvalidStatus> {
    let status = StatusCode::from_u16(code).map_err(|_| InvalidStatus { code })?;
    if status.canonical_reason().is_none() {
        return Err(InvalidStatus { code });
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Model {
        id: u32,
        name: &'static str,
    }

    #[test]
    fn json_sets_default_content_type() {
        let response = Response::json(StatusCode::OK, &Model { id: 1, name: "a" });

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), br#"{"id":1,"name":"a"}"#);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn explicit_header_wins_over_default() {
        let response = Response::json(StatusCode::CREATED, &Model { id: 2, name: "b" })
            .header(header::CONTENT_TYPE, HeaderValue::from_static("application/vnd.model+json"));

        assert_eq!(response.headers().get_all(header::CONTENT_TYPE).iter().count(), 1);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "application/vnd.model+json");
    }

    #[test]
    fn text_response() {
        let response = Response::text(StatusCode::NOT_FOUND, "missing");
        assert_eq!(response.body().as_ref(), b"missing");
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/plain; charset=utf-8");
    }

    #[test]
    fn status_code_must_have_reason_phrase() {
        assert_eq!(Response::from_status_code(404).unwrap().status(), StatusCode::NOT_FOUND);
        assert_eq!(Response::from_status_code(42).unwrap_err(), InvalidStatus { code: 42 });
        assert_eq!(Response::from_status_code(599).unwrap_err(), InvalidStatus { code: 599 });
    }

    #[test]
    fn into_parts_keeps_headers_and_trailers() {
        let response = Response::with_body(StatusCode::ACCEPTED, "body")
            .header(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))
            .trailer(HeaderName::from_static("x-checksum"), HeaderValue::from_static("abc"));

        let (head, body, trailers) = response.into_parts();
        assert_eq!(head.status(), StatusCode::ACCEPTED);
        assert_eq!(head.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");
        assert_eq!(body.as_ref(), b"body");
        assert_eq!(trailers.unwrap().get("x-checksum").unwrap(), "abc");
    }
}
