//! Capabilities an application plugs into a connection.
//!
//! - [`Controller`]: turns a request into a response, see [`controller_fn`]
//! - [`Prepare`]: async per-connection setup, see [`prepare_fn`] and [`NoopPrepare`]
//! - [`ErrorTransform`]: maps controller failures to responses, see [`DefaultErrorTransform`]
//!   and the status-carrying [`StatusError`] / [`StatusCodeError`]
//! - [`Channel`]: the three bundled for one connection, handed out by a [`ChannelFactory`]

mod channel;
mod controller;
mod error_transform;
mod prepare;

pub use channel::Channel;
pub use channel::ChannelBuilder;
pub use channel::ChannelFactory;
pub use controller::controller_fn;
pub use controller::Controller;
pub use controller::ControllerFn;
pub use error_transform::BoxedStatusError;
pub use error_transform::DefaultErrorTransform;
pub use error_transform::ErrorTransform;
pub use error_transform::StatusCodeError;
pub use error_transform::StatusError;
pub use prepare::prepare_fn;
pub use prepare::NoopPrepare;
pub use prepare::Prepare;
pub use prepare::PrepareFn;

pub use crate::protocol::BoxError;
