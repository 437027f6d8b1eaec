use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use http::StatusCode;
use tokio::task::AbortHandle;
use tracing::{error, warn};

use crate::handler::{Controller, ErrorTransform};
use crate::protocol::{BoxError, Request, Response};

/// Bridges a completed [`Request`] to the [`Controller`] and always yields a [`Response`].
///
/// The controller runs on its own task. A controller error, or a panic inside it, is
/// handed to the [`ErrorTransform`]; a panicking transform is answered with a bare
/// `500 Internal Server Error`.
///
/// Dropping the future returned by [`Dispatcher::dispatch`] aborts the controller task,
/// so a closed connection never receives a late result.
#[derive(Clone)]
pub struct Dispatcher {
    controller: Arc<dyn Controller>,
    error_transform: Arc<dyn ErrorTransform>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(controller: Arc<dyn Controller>, error_transform: Arc<dyn ErrorTransform>) -> Self {
        Self { controller, error_transform }
    }

    pub async fn dispatch(&self, request: Request) -> Response {
        let controller = Arc::clone(&self.controller);
        let handle = tokio::spawn(async move { controller.handle(request).await });
        let _guard = AbortOnDrop(handle.abort_handle());

        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(BoxError::from(e)),
        };

        match result {
            Ok(response) => response,
            Err(e) => {
                warn!(cause = %e, "controller failed, transforming error into response");
                self.transform(e)
            }
        }
    }

    fn transform(&self, error: BoxError) -> Response {
        match catch_unwind(AssertUnwindSafe(|| self.error_transform.transform(error))) {
            Ok(response) => response,
            Err(_) => {
                error!("error transform panicked, answering with a bare 500");
                Response::new(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

#[derive(Debug)]
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{controller_fn, BoxedStatusError, DefaultErrorTransform, StatusCodeError, StatusError};
    use crate::protocol::{DecodeError, RequestHead};
    use bytes::Bytes;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn request(body: Option<&'static [u8]>) -> Request {
        let head = RequestHead::from(http::Request::builder().uri("/x").body(()).unwrap());
        Request::new(head, body.map(Bytes::from_static), None)
    }

    fn dispatcher<C: Controller>(controller: C) -> Dispatcher {
        Dispatcher::new(Arc::new(controller), Arc::new(DefaultErrorTransform))
    }

    #[tokio::test]
    async fn test_success_is_forwarded_unchanged() {
        let dispatcher = dispatcher(controller_fn(|_request: Request| async {
            Ok::<_, BoxError>(Response::text(StatusCode::ACCEPTED, "queued"))
        }));

        let response = dispatcher.dispatch(request(None)).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(&response.body()[..], b"queued");
    }

    #[tokio::test]
    async fn test_status_error_uses_its_code() {
        let dispatcher = dispatcher(controller_fn(|_request: Request| async {
            Err::<Response, _>(StatusError::not_found())
        }));

        let response = dispatcher.dispatch(request(None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[derive(Debug)]
    struct Locked;

    impl fmt::Display for Locked {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("resource is locked")
        }
    }

    impl std::error::Error for Locked {}

    impl StatusCodeError for Locked {
        fn status_code(&self) -> u16 {
            423
        }
    }

    #[tokio::test]
    async fn test_custom_status_code_error_uses_its_code() {
        let dispatcher = dispatcher(controller_fn(|_request: Request| async {
            Err::<Response, _>(BoxedStatusError::from(Locked))
        }));

        let response = dispatcher.dispatch(request(None)).await;
        assert_eq!(response.status(), StatusCode::LOCKED);
        assert_eq!(&response.body()[..], b"resource is locked");
    }

    #[tokio::test]
    async fn test_decode_failure_is_500_with_description() {
        #[derive(Deserialize)]
        #[allow(dead_code, reason = "only decoded")]
        struct Model {
            id: u32,
        }

        let dispatcher = dispatcher(controller_fn(|request: Request| async move {
            let _model: Model = request.decode_body()?;
            Ok::<_, DecodeError>(Response::new(StatusCode::OK))
        }));

        let response = dispatcher.dispatch(request(Some(b"{bad json"))).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.body().starts_with(b"invalid json body: "));
    }

    #[tokio::test]
    async fn test_panicking_controller_goes_through_transform() {
        let dispatcher = dispatcher(controller_fn(|_request: Request| async {
            if true {
                panic!("controller bug");
            }
            Ok::<_, BoxError>(Response::new(StatusCode::OK))
        }));

        let response = dispatcher.dispatch(request(None)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!response.body().is_empty());
    }

    #[tokio::test]
    async fn test_panicking_transform_is_bare_500() {
        let controller = controller_fn(|_request: Request| async { Err::<Response, _>(StatusError::new(418)) });
        let transform = |_error: BoxError| -> Response { panic!("transform bug") };
        let dispatcher = Dispatcher::new(Arc::new(controller), Arc::new(transform));

        let response = dispatcher.dispatch(request(None)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.body().is_empty());
        assert!(response.headers().is_empty());
    }

    #[tokio::test]
    async fn test_dropping_dispatch_aborts_controller() {
        let finished = Arc::new(AtomicBool::new(false));
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let started_tx = std::sync::Mutex::new(Some(started_tx));

        let flag = Arc::clone(&finished);
        let dispatcher = dispatcher(controller_fn(move |_request: Request| {
            let flag = Arc::clone(&flag);
            let started = started_tx.lock().unwrap().take();
            async move {
                if let Some(started) = started {
                    let _ = started.send(());
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
                flag.store(true, Ordering::SeqCst);
                Ok::<_, BoxError>(Response::new(StatusCode::OK))
            }
        }));

        let dispatch = dispatcher.dispatch(request(None));
        tokio::select! {
            _ = dispatch => panic!("controller should still be sleeping"),
            _ = started_rx => {}
        }

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }
}
