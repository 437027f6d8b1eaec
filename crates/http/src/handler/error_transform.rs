use std::error::Error;
use std::fmt;

use http::StatusCode;

use crate::protocol::{status_from_u16, BoxError, Response};

/// An error that knows which HTTP status it should be answered with.
///
/// [`StatusError`] is recognized as is. Other implementors reach the
/// [`DefaultErrorTransform`] with their status only when boxed through
/// [`into_box_error`](StatusCodeError::into_box_error) or [`BoxedStatusError`]; a plain
/// `.into()` hides the status behind `dyn Error`.
pub trait StatusCodeError: Error + Send + Sync + 'static {
    fn status_code(&self) -> u16;

    fn into_box_error(self) -> BoxError
    where
        Self: Sized,
    {
        Box::new(BoxedStatusError::new(self))
    }
}

/// Any [`StatusCodeError`], boxed so the error transform can still read its status.
#[derive(Debug)]
pub struct BoxedStatusError(Box<dyn StatusCodeError>);

impl BoxedStatusError {
    pub fn new<E: StatusCodeError>(error: E) -> Self {
        Self(Box::new(error))
    }

    pub fn status_code(&self) -> u16 {
        self.0.status_code()
    }

    pub fn get_ref(&self) -> &dyn StatusCodeError {
        self.0.as_ref()
    }
}

impl<E: StatusCodeError> From<E> for BoxedStatusError {
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

impl fmt::Display for BoxedStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Error for BoxedStatusError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

/// A status-carrying error for controllers to return.
///
/// The default transform answers it with `status_code` and the message as the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusError {
    status_code: u16,
    message: Option<String>,
}

impl StatusError {
    pub fn new(status_code: u16) -> Self {
        Self { status_code, message: None }
    }

    pub fn with_message(status_code: u16, message: impl Into<String>) -> Self {
        Self { status_code, message: Some(message.into()) }
    }

    pub fn not_found() -> Self {
        Self::new(404)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_message(400, message)
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl StatusCodeError for StatusError {
    fn status_code(&self) -> u16 {
        self.status_code
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => f.write_str(message),
            None => write!(f, "status {}", self.status_code),
        }
    }
}

impl Error for StatusError {}

/// Turns a controller failure into the response that is written instead.
///
/// Implementations must not panic; if one does, the connection falls back to a bare
/// `500 Internal Server Error`.
pub trait ErrorTransform: Send + Sync + 'static {
    fn transform(&self, error: BoxError) -> Response;
}

impl<F> ErrorTransform for F
where
    F: Fn(BoxError) -> Response + Send + Sync + 'static,
{
    fn transform(&self, error: BoxError) -> Response {
        (self)(error)
    }
}

/// `500` with the error's description as a text body, or the status of a [`StatusError`]
/// or [`BoxedStatusError`].
///
/// A status code that can't be written on a status line is answered with `500`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorTransform;

impl ErrorTransform for DefaultErrorTransform {
    fn transform(&self, error: BoxError) -> Response {
        let status = error
            .downcast_ref::<StatusError>()
            .map(StatusCodeError::status_code)
            .or_else(|| error.downcast_ref::<BoxedStatusError>().map(BoxedStatusError::status_code))
            .and_then(|code| status_from_u16(code).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        Response::text(status, error.to_string())
    }
}
