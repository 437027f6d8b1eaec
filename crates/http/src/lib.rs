//! Per-connection HTTP/1.1 request assembly and response dispatch.
//!
//! A connection reads request events off the wire, assembles them into one immutable
//! [`Request`](protocol::Request) at a time, hands it to an application
//! [`Controller`](handler::Controller) on its own task, and writes the
//! [`Response`](protocol::Response) back with `content-length` framing and a
//! keep-alive or close decision.
//!
//! # Example
//!
//! ```no_run
//! use aqueduct_http::connection::{serve_connection, HttpConnection};
//! use aqueduct_http::handler::{controller_fn, Channel};
//! use aqueduct_http::protocol::{BoxError, Request, Response};
//! use http::StatusCode;
//! use tokio::net::TcpListener;
//! use tracing::{info, warn};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let channel = Channel::new(controller_fn(|request: Request| async move {
//!         info!(path = request.uri().path(), "receiving request");
//!         Ok::<_, BoxError>(Response::text(StatusCode::OK, "Hello World!\r\n"))
//!     }));
//!
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     loop {
//!         let (tcp_stream, _remote_addr) = listener.accept().await?;
//!         let channel = channel.clone();
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             if let Err(e) = serve_connection(HttpConnection::new(reader, writer), &channel).await {
//!                 warn!(cause = %e, "connection ended with error");
//!             }
//!         });
//!     }
//! }
//! ```
//!
//! # Modules
//!
//! - [`codec`]: request decoder and response encoder over `tokio-util` codecs
//! - [`protocol`]: events, request and response values, errors
//! - [`handler`]: controller, prepare and error transform capabilities, bundled as a channel
//! - [`connection`]: accumulator, dispatcher, writer and the per-connection loop
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only, one request in flight per connection
//! - Request head at most 8KB and 64 headers
//! - Bodies are buffered whole; responses are always length framed
//!
//! # Safety
//!
//! The header decoder builds header values from bytes `httparse` already validated,
//! without checking them a second time.

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
