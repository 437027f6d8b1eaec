//! Serializes a response head into the status line and header section.
//!
//! The status line is always written as `HTTP/1.1`, whatever version the request used.
//! Bodies are length framed, so the encoder sets `content-length` from the length it is
//! given and replaces any value the controller put there. `1xx` and `204` responses never
//! carry the header.

use crate::protocol::{ResponseHead, SendError};

use bytes::{BufMut, BytesMut};

use http::{header, HeaderValue, StatusCode};
use std::io;
use std::io::Write;
use tokio_util::codec::Encoder;

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encoder for a [`ResponseHead`] together with the exact body length.
#[derive(Debug)]
pub struct HeaderEncoder;

impl Encoder<(ResponseHead, u64)> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (ResponseHead, u64), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, length) = item;

        dst.reserve(INIT_HEADER_SIZE);
        let status = head.status();
        write!(FastWrite(dst), "HTTP/1.1 {} {}\r\n", status.as_str(), status.canonical_reason().unwrap_or(""))?;

        if forbids_body(status) {
            head.headers_mut().remove(header::CONTENT_LENGTH);
        } else {
            head.headers_mut().insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        }

        for (header_name, header_value) in head.headers().iter() {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Statuses that must be sent without a body or `content-length`.
pub(crate) fn forbids_body(status: StatusCode) -> bool {
    status.is_informational() || status == StatusCode::NO_CONTENT
}

/// `io::Write` over a `BytesMut` that already has room reserved.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
