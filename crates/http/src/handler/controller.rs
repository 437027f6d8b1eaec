use std::future::Future;

use async_trait::async_trait;

use crate::protocol::{BoxError, Request, Response};

/// Application logic that turns a [`Request`] into a [`Response`].
///
/// The controller runs on its own task, so it may suspend freely without holding up
/// other connections. An `Err` goes through the channel's
/// [`ErrorTransform`](crate::handler::ErrorTransform).
#[async_trait]
pub trait Controller: Send + Sync + 'static {
    async fn handle(&self, request: Request) -> Result<Response, BoxError>;
}

/// A [`Controller`] backed by an async function or closure.
#[derive(Debug)]
pub struct ControllerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut, E> Controller for ControllerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, E>> + Send + 'static,
    E: Into<BoxError>,
{
    async fn handle(&self, request: Request) -> Result<Response, BoxError> {
        (self.f)(request).await.map_err(Into::into)
    }
}

/// Wraps an async function as a [`Controller`].
///
/// ```
/// use aqueduct_http::handler::controller_fn;
/// use aqueduct_http::protocol::{BoxError, Request, Response};
/// use http::StatusCode;
///
/// let controller = controller_fn(|request: Request| async move {
///     Ok::<_, BoxError>(Response::text(StatusCode::OK, request.uri().path().to_string()))
/// });
/// ```
pub fn controller_fn<F, Fut, E>(f: F) -> ControllerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, E>> + Send + 'static,
    E: Into<BoxError>,
{
    ControllerFn { f }
}
