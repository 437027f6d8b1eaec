//! Request head decoder.
//!
//! Parses the request line and header section with `httparse`, then decides how the body
//! is framed. Header values are sliced out of one frozen buffer, so no header bytes are copied.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header section size: 8KB
//! - HTTP/1.0 and HTTP/1.1 only

use std::mem::MaybeUninit;

use bytes::BytesMut;
use http::header::GetAll;
use http::{HeaderName, HeaderValue, Method, Uri};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::body::PayloadSize;
use crate::ensure;
use crate::protocol::{ParseError, RequestHead};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Shortest possible request head, `GET / HTTP/1.1\r\n\r\n` minus the path byte
const MIN_HEAD_BYTES: usize = 14;

/// Decodes a [`RequestHead`] and the [`PayloadSize`] that frames its body.
#[derive(Debug)]
pub struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = (RequestHead, PayloadSize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < MIN_HEAD_BYTES {
            return Ok(None);
        }

        let mut req = httparse::Request::new(&mut []);
        let mut headers = [const { MaybeUninit::<httparse::Header>::uninit() }; MAX_HEADER_NUM];

        let parsed_result = req.parse_with_uninit_headers(src, &mut headers).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e.to_string()),
        });

        let body_offset = match parsed_result? {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };

        trace!(head_size = body_offset, "parsed request head");
        ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

        let header_count = req.headers.len();

        let mut header_index: [HeaderIndex; MAX_HEADER_NUM] = EMPTY_HEADER_INDEX_ARRAY;
        HeaderIndex::record(src, req.headers, &mut header_index);

        let version = match req.version {
            Some(0) => http::Version::HTTP_10,
            Some(1) => http::Version::HTTP_11,
            _ => return Err(ParseError::InvalidVersion(req.version)),
        };

        let method = req.method.ok_or(ParseError::InvalidMethod)?;
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| ParseError::InvalidMethod)?;
        let uri = req.path.ok_or(ParseError::InvalidUri)?;
        let uri = Uri::try_from(uri).map_err(|_| ParseError::InvalidUri)?;

        let mut request = http::Request::new(());
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        *request.version_mut() = version;

        let headers = request.headers_mut();
        headers.reserve(header_count);

        let header_bytes = src.split_to(body_offset).freeze();
        for index in &header_index[..header_count] {
            let name = HeaderName::from_bytes(&header_bytes[index.name.0..index.name.1]).map_err(ParseError::invalid_header)?;

            // SAFETY: httparse only accepts header values made of visible ASCII, spaces, tabs and
            // obs-text (0x80-0xFF), all of which `HeaderValue` allows
            let value = unsafe { HeaderValue::from_maybe_shared_unchecked(header_bytes.slice(index.value.0..index.value.1)) };

            headers.append(name, value);
        }

        let head = RequestHead::from(request);
        let payload_size = parse_payload(&head)?;

        Ok(Some((head, payload_size)))
    }
}

/// Byte ranges of one header's name and value inside the parsed buffer.
#[derive(Clone, Copy)]
struct HeaderIndex {
    name: (usize, usize),
    value: (usize, usize),
}

const EMPTY_HEADER_INDEX: HeaderIndex = HeaderIndex { name: (0, 0), value: (0, 0) };

const EMPTY_HEADER_INDEX_ARRAY: [HeaderIndex; MAX_HEADER_NUM] = [EMPTY_HEADER_INDEX; MAX_HEADER_NUM];

impl HeaderIndex {
    fn record(bytes: &[u8], headers: &[httparse::Header<'_>], indices: &mut [HeaderIndex]) {
        let bytes_ptr = bytes.as_ptr() as usize;
        for (header, indices) in headers.iter().zip(indices.iter_mut()) {
            let name_start = header.name.as_ptr() as usize - bytes_ptr;
            indices.name = (name_start, name_start + header.name.len());
            let value_start = header.value.as_ptr() as usize - bytes_ptr;
            indices.value = (value_start, value_start + header.value.len());
        }
    }
}

/// Chooses the body framing from `transfer-encoding` and `content-length`,
/// following [RFC 9112 Section 6.3](https://www.rfc-editor.org/rfc/rfc9112#section-6.3).
///
/// The method plays no part: a `GET` with a `content-length` still has its body read,
/// so the bytes never bleed into the next request.
fn parse_payload(head: &RequestHead) -> Result<PayloadSize, ParseError> {
    let te_header = head.headers().get(http::header::TRANSFER_ENCODING);
    let cl_header = head.headers().get(http::header::CONTENT_LENGTH);

    match (te_header, cl_header) {
        (None, None) => Ok(PayloadSize::Empty),

        (Some(te_value), None) => {
            if is_chunked(head.headers().get_all(http::header::TRANSFER_ENCODING)) {
                Ok(PayloadSize::Chunked)
            } else {
                let te_value = String::from_utf8_lossy(te_value.as_bytes());
                Err(ParseError::invalid_transfer_encoding(format!("unsupported transfer coding {te_value}")))
            }
        }

        (None, Some(cl_value)) => {
            let cl_str = cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;

            let length =
                cl_str.trim().parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;

            if length == 0 { Ok(PayloadSize::Empty) } else { Ok(PayloadSize::Length(length)) }
        }

        (Some(_), Some(_)) => Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers")),
    }
}

/// True when `chunked` is the only transfer coding, sent in a single header line.
fn is_chunked(values: GetAll<'_, HeaderValue>) -> bool {
    let mut values = values.iter();
    match (values.next(), values.next()) {
        (Some(value), None) => value.as_bytes().trim_ascii().eq_ignore_ascii_case(b"chunked"),
        _ => false,
    }
}
