use std::fmt;
use std::sync::Arc;

use crate::connection::Dispatcher;
use crate::handler::{Controller, DefaultErrorTransform, ErrorTransform, NoopPrepare, Prepare};
use crate::protocol::BoxError;

/// The capabilities installed on one connection: a prepare step, a controller and an
/// error transform.
///
/// Cloning is cheap; clones share the same controller and transform.
#[derive(Clone)]
pub struct Channel {
    prepare: Arc<dyn Prepare>,
    dispatcher: Dispatcher,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel").field("dispatcher", &self.dispatcher).finish_non_exhaustive()
    }
}

impl Channel {
    /// A channel with no prepare step and the [`DefaultErrorTransform`].
    pub fn new<C: Controller>(controller: C) -> Self {
        Self::builder(controller).build()
    }

    pub fn builder<C: Controller>(controller: C) -> ChannelBuilder {
        ChannelBuilder {
            controller: Arc::new(controller),
            prepare: Arc::new(NoopPrepare),
            error_transform: Arc::new(DefaultErrorTransform),
        }
    }

    pub async fn prepare(&self) -> Result<(), BoxError> {
        self.prepare.prepare().await
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

pub struct ChannelBuilder {
    controller: Arc<dyn Controller>,
    prepare: Arc<dyn Prepare>,
    error_transform: Arc<dyn ErrorTransform>,
}

impl fmt::Debug for ChannelBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelBuilder").finish_non_exhaustive()
    }
}

impl ChannelBuilder {
    #[must_use]
    pub fn prepare<P: Prepare>(mut self, prepare: P) -> Self {
        self.prepare = Arc::new(prepare);
        self
    }

    #[must_use]
    pub fn error_transform<T: ErrorTransform>(mut self, error_transform: T) -> Self {
        self.error_transform = Arc::new(error_transform);
        self
    }

    pub fn build(self) -> Channel {
        Channel { prepare: self.prepare, dispatcher: Dispatcher::new(self.controller, self.error_transform) }
    }
}

/// Produces the [`Channel`] for each accepted connection.
pub trait ChannelFactory: Send + Sync + 'static {
    fn new_channel(&self) -> Channel;
}

/// Every connection shares the same capabilities.
impl ChannelFactory for Channel {
    fn new_channel(&self) -> Channel {
        self.clone()
    }
}

impl<F> ChannelFactory for F
where
    F: Fn() -> Channel + Send + Sync + 'static,
{
    fn new_channel(&self) -> Channel {
        (self)()
    }
}
