//! Listener bootstrap for [`aqueduct_http`] channels.
//!
//! A [`Server`] binds a TCP listener from a [`ServerConfig`], asks its
//! [`ChannelFactory`](aqueduct_http::handler::ChannelFactory) for a channel on every accepted
//! connection, and serves that connection with
//! [`serve_connection`](aqueduct_http::connection::serve_connection). Shutdown stops
//! accepting, closes idle connections, lets in-flight requests finish with
//! `connection: close`, and cancels whatever is still open once the shutdown timeout
//! elapses.
//!
//! # Example
//!
//! ```no_run
//! use aqueduct::{Server, ServerConfig};
//! use aqueduct_http::handler::{controller_fn, Channel};
//! use aqueduct_http::protocol::{BoxError, Request, Response};
//! use http::StatusCode;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let channel = Channel::new(controller_fn(|_request: Request| async {
//!         Ok::<_, BoxError>(Response::text(StatusCode::OK, "hello"))
//!     }));
//!
//!     Server::builder().config(ServerConfig::from_env()?).channel(channel).build()?.run()?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod logging;
pub mod server;

pub use config::{ConfigError, ServerConfig};
pub use server::{Server, ServerBuildError, ServerBuilder, ServerError, ServerHandle};
