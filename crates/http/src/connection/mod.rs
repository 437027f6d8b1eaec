//! Per-connection request pipeline.
//!
//! Events flow through four stages, one request at a time:
//!
//! - [`MessageAccumulator`]: `Head`, `BodyChunk*`, `End` into a [`Request`](crate::protocol::Request)
//! - [`Dispatcher`]: request to controller, failures through the error transform
//! - [`ConnectionWriter`]: response framing, `connection` header, close after non-persistent responses
//! - [`HttpConnection`]: the loop tying them to a reader and writer, tracked as a [`ConnectionState`]
//!
//! [`serve_connection`] adds the channel's prepare step in front of the loop.

mod accumulator;
mod dispatch;
mod http_connection;
mod state;
mod writer;

pub use accumulator::MessageAccumulator;
pub use accumulator::DEFAULT_MAX_BODY_SIZE;
pub use dispatch::Dispatcher;
pub use http_connection::serve_connection;
pub use http_connection::HttpConnection;
pub use state::ConnectionState;
pub use writer::ConnectionWriter;
