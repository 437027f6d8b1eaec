//! Wire codec for HTTP/1.x.
//!
//! - [`RequestDecoder`]: bytes to [`RequestEvent`](crate::protocol::RequestEvent)s,
//!   built from the [`header`] and [`body`] decoders
//! - [`ResponseEncoder`]: [`ResponseFrame`](crate::protocol::ResponseFrame)s to bytes,
//!   always with `content-length` framing
//!
//! # Example
//!
//! ```
//! use aqueduct_http::codec::RequestDecoder;
//! use aqueduct_http::protocol::RequestEvent;
//! use bytes::BytesMut;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from("GET /x HTTP/1.1\r\nHost: a\r\n\r\n");
//!
//! let head = decoder.decode(&mut buffer).unwrap();
//! assert!(matches!(head, Some(RequestEvent::Head(_))));
//! let end = decoder.decode(&mut buffer).unwrap();
//! assert!(matches!(end, Some(RequestEvent::End(None))));
//! ```

mod body;
mod header;
mod request_decoder;
mod response_encoder;

pub(crate) use header::forbids_body;
pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
