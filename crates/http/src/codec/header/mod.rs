//! Request head decoding and response head encoding.
//!
//! - [`HeaderDecoder`]: parses the request line and headers, and picks the body framing
//! - [`HeaderEncoder`]: writes the status line and headers, including `content-length`

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
pub(crate) use header_encoder::forbids_body;
