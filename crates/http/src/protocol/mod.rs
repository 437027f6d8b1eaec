//! Core HTTP protocol types.
//!
//! This module holds the values that flow through a connection's pipeline:
//!
//! - **Events and frames** ([`message`]): what the decoder produces and the encoder consumes
//!   - [`RequestEvent`]: `Head`, `BodyChunk` or `End` for one inbound message
//!   - [`ResponseFrame`]: `Head`, `Body` or `End` for one outbound message
//!
//! - **Request** ([`request`]): [`RequestHead`] as parsed from the wire, and the
//!   assembled, immutable [`Request`]
//!
//! - **Response** ([`response`]): [`Response`] built by controllers and the error transform,
//!   and [`ResponseHead`] as handed to the encoder
//!
//! - **Errors** ([`error`]):
//!   - [`HttpError`]: top-level, ends a connection
//!   - [`ParseError`]: malformed bytes on the wire
//!   - [`SendError`]: response write failures
//!   - [`ProtocolError`]: event order violations
//!   - [`DecodeError`]: typed body decode failures

mod message;
pub use message::RequestEvent;
pub use message::ResponseFrame;

mod request;
pub use request::Request;
pub use request::RequestHead;

mod response;
pub(crate) use response::status_from_u16;
pub use response::Response;
pub use response::ResponseHead;

mod error;
pub use error::BoxError;
pub use error::DecodeError;
pub use error::HttpError;
pub use error::InvalidStatus;
pub use error::ParseError;
pub use error::ProtocolError;
pub use error::SendError;
