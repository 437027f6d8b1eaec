use std::error::Error;
use std::io;
use thiserror::Error;

/// Error type crossing the controller boundary.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Everything that can end a connection.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },

    #[error("protocol violation: {source}")]
    ProtocolViolation {
        #[from]
        source: ProtocolError,
    },

    #[error("prepare channel error: {source}")]
    PrepareError { source: BoxError },
}

impl HttpError {
    pub fn prepare<E: Into<BoxError>>(e: E) -> Self {
        Self::PrepareError { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid transfer-encoding header: {reason}")]
    InvalidTransferEncoding { reason: String },

    #[error("invalid trailer: {reason}")]
    InvalidTrailer { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn invalid_transfer_encoding<S: ToString>(str: S) -> Self {
        Self::InvalidTransferEncoding { reason: str.to_string() }
    }

    pub fn invalid_trailer<S: ToString>(str: S) -> Self {
        Self::InvalidTrailer { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid frame: {reason}")]
    InvalidFrame { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_frame<S: ToString>(str: S) -> Self {
        Self::InvalidFrame { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Violations of the one-request-at-a-time event order on a connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("received a request head while another request is in flight")]
    HeadWhileInFlight,

    #[error("received end of message without a request head")]
    EndWithoutHead,

    #[error("received body bytes without a request head")]
    BodyWithoutHead,

    #[error("received request data after the request was completed")]
    DataAfterEnd,

    #[error("request body size {size} exceed the limit {max_size}")]
    BodyTooLarge { size: usize, max_size: usize },
}

/// Failure to decode a typed request body.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("no body")]
    NoBody,

    #[error("invalid json body: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

/// A status integer that can't be written on a status line.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid status code {code}")]
pub struct InvalidStatus {
    pub code: u16,
}
