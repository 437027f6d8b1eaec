use std::future::Future;

use async_trait::async_trait;

use crate::protocol::BoxError;

/// Per-connection setup that must succeed before any request is read.
///
/// A failure closes the connection without reading or writing a byte.
#[async_trait]
pub trait Prepare: Send + Sync + 'static {
    async fn prepare(&self) -> Result<(), BoxError>;
}

/// Accepts every connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPrepare;

#[async_trait]
impl Prepare for NoopPrepare {
    async fn prepare(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[derive(Debug)]
pub struct PrepareFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut, E> Prepare for PrepareFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError>,
{
    async fn prepare(&self) -> Result<(), BoxError> {
        (self.f)().await.map_err(Into::into)
    }
}

/// Wraps an async function as a [`Prepare`] step.
pub fn prepare_fn<F, Fut, E>(f: F) -> PrepareFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError>,
{
    PrepareFn { f }
}
