//! Decoder for request bodies sent with `transfer-encoding: chunked`.
//!
//! Wire format per [RFC 9112 Section 7.1](https://www.rfc-editor.org/rfc/rfc9112#section-7.1):
//! a hex size line, the chunk bytes and CRLF, repeated until a zero-size chunk,
//! followed by an optional trailer section and a final CRLF.

use crate::codec::body::PayloadItem;
use crate::protocol::ParseError;
use bytes::{Buf, Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue};
use std::io;
use std::io::ErrorKind;
use std::task::Poll;
use tokio_util::codec::Decoder;
use tracing::trace;
use ChunkedState::*;

const MAX_TRAILER_NUM: usize = 32;
const MAX_TRAILER_BYTES: usize = 8 * 1024;

/// Chunked body decoder.
///
/// Yields one [`PayloadItem::Chunk`] per contiguous run of chunk data found in the buffer,
/// then a single [`PayloadItem::Eof`] carrying the trailer fields, if any were sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining_size: u64,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: Size, remaining_size: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// hex digits of the chunk size
    Size,
    /// whitespace after the size
    SizeLws,
    /// chunk extension, ignored
    Extension,
    /// LF closing the size line
    SizeLf,
    /// chunk data
    Body,
    /// CR after chunk data
    BodyCr,
    /// LF after chunk data
    BodyLf,
    /// trailer section after the last chunk, up to and including the empty line
    Trailers,
    End,
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.state == End {
                // a decoder is only asked once more after it reported eof
                return Ok(Some(PayloadItem::Eof(None)));
            }

            if src.is_empty() {
                return Ok(None);
            }

            if self.state == Trailers {
                return match read_trailers(src)? {
                    Some(trailers) => {
                        trace!(count = trailers.as_ref().map_or(0, HeaderMap::len), "finished reading chunked data");
                        self.state = End;
                        Ok(Some(PayloadItem::Eof(trailers)))
                    }
                    None => Ok(None),
                };
            }

            let mut buf = None;

            self.state = match self.state.step(src, &mut self.remaining_size, &mut buf) {
                Poll::Pending => return Ok(None),
                Poll::Ready(Ok(new_state)) => new_state,
                Poll::Ready(Err(e)) => return Err(ParseError::io(e)),
            };

            if let Some(bytes) = buf {
                trace!(len = bytes.len(), "read chunked bytes");
                return Ok(Some(PayloadItem::Chunk(bytes)));
            }
        }
    }
}

/// Parses the trailer section once it is complete in `src`.
///
/// Returns `Ok(None)` while more bytes are needed, `Ok(Some(None))` for an empty
/// trailer section and `Ok(Some(Some(map)))` when fields were sent.
fn read_trailers(src: &mut BytesMut) -> Result<Option<Option<HeaderMap>>, ParseError> {
    let mut parsed = [httparse::EMPTY_HEADER; MAX_TRAILER_NUM];

    let (consumed, fields) = match httparse::parse_headers(&src[..], &mut parsed) {
        Ok(httparse::Status::Complete(complete)) => complete,
        Ok(httparse::Status::Partial) => {
            if src.len() > MAX_TRAILER_BYTES {
                return Err(ParseError::invalid_trailer(format!("trailer section exceed {MAX_TRAILER_BYTES} bytes")));
            }
            return Ok(None);
        }
        Err(httparse::Error::TooManyHeaders) => return Err(ParseError::too_many_headers(MAX_TRAILER_NUM)),
        Err(e) => return Err(ParseError::invalid_trailer(e)),
    };

    let mut trailers = HeaderMap::new();
    for field in fields {
        let name = HeaderName::from_bytes(field.name.as_bytes()).map_err(ParseError::invalid_trailer)?;
        let value = HeaderValue::from_bytes(field.value).map_err(ParseError::invalid_trailer)?;
        trailers.append(name, value);
    }

    src.advance(consumed);

    if trailers.is_empty() { Ok(Some(None)) } else { Ok(Some(Some(trailers))) }
}

macro_rules! try_next_byte {
    ($src:ident) => {{
        if $src.len() > 0 {
            $src.get_u8()
        } else {
            return Poll::Pending;
        }
    }};
}

fn invalid_input(msg: &'static str) -> Poll<Result<ChunkedState, io::Error>> {
    Poll::Ready(Err(io::Error::new(ErrorKind::InvalidInput, msg)))
}

impl ChunkedState {
    fn step(
        &self,
        src: &mut BytesMut,
        remaining_size: &mut u64,
        buf: &mut Option<Bytes>,
    ) -> Poll<Result<ChunkedState, io::Error>> {
        match self {
            Size => ChunkedState::read_size(src, remaining_size),
            SizeLws => ChunkedState::read_size_lws(src),
            Extension => ChunkedState::read_extension(src),
            SizeLf => ChunkedState::read_size_lf(src, *remaining_size),
            Body => ChunkedState::read_body(src, remaining_size, buf),
            BodyCr => ChunkedState::read_body_cr(src),
            BodyLf => ChunkedState::read_body_lf(src),
            // handled by the decoder itself
            Trailers => Poll::Ready(Ok(Trailers)),
            End => Poll::Ready(Ok(End)),
        }
    }

    fn read_size(src: &mut BytesMut, size: &mut u64) -> Poll<Result<ChunkedState, io::Error>> {
        let digit = match try_next_byte!(src) {
            b @ b'0'..=b'9' => b - b'0',
            b @ b'a'..=b'f' => b + 10 - b'a',
            b @ b'A'..=b'F' => b + 10 - b'A',
            b'\t' | b' ' => return Poll::Ready(Ok(SizeLws)),
            b';' => return Poll::Ready(Ok(Extension)),
            b'\r' => return Poll::Ready(Ok(SizeLf)),
            _ => return invalid_input("invalid chunk size line: Invalid Size"),
        };

        match size.checked_mul(16).and_then(|s| s.checked_add(digit as u64)) {
            Some(new_size) => {
                *size = new_size;
                Poll::Ready(Ok(Size))
            }
            None => invalid_input("invalid overflow chunked length"),
        }
    }

    fn read_size_lws(src: &mut BytesMut) -> Poll<Result<ChunkedState, io::Error>> {
        match try_next_byte!(src) {
            // no more digits may follow
            b'\t' | b' ' => Poll::Ready(Ok(SizeLws)),
            b';' => Poll::Ready(Ok(Extension)),
            b'\r' => Poll::Ready(Ok(SizeLf)),
            _ => invalid_input("invalid chunk size linear white space"),
        }
    }

    /// Extensions are skipped up to the CR; a bare LF inside one is rejected.
    fn read_extension(src: &mut BytesMut) -> Poll<Result<ChunkedState, io::Error>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(SizeLf)),
            b'\n' => invalid_input("invalid chunk extension contains newline"),
            _ => Poll::Ready(Ok(Extension)),
        }
    }

    fn read_size_lf(src: &mut BytesMut, size: u64) -> Poll<Result<ChunkedState, io::Error>> {
        match try_next_byte!(src) {
            b'\n' if size == 0 => Poll::Ready(Ok(Trailers)),
            b'\n' => Poll::Ready(Ok(Body)),
            _ => invalid_input("invalid chunk size LF"),
        }
    }

    fn read_body(
        src: &mut BytesMut,
        remaining_size: &mut u64,
        buf: &mut Option<Bytes>,
    ) -> Poll<Result<ChunkedState, io::Error>> {
        if *remaining_size == 0 {
            return Poll::Ready(Ok(BodyCr));
        }

        let remaining = usize::try_from(*remaining_size).unwrap_or(usize::MAX);
        let read_size = std::cmp::min(remaining, src.len());

        *remaining_size -= read_size as u64;
        *buf = Some(src.split_to(read_size).freeze());

        if *remaining_size > 0 { Poll::Ready(Ok(Body)) } else { Poll::Ready(Ok(BodyCr)) }
    }

    fn read_body_cr(src: &mut BytesMut) -> Poll<Result<ChunkedState, io::Error>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(BodyLf)),
            _ => invalid_input("invalid chunk body CR"),
        }
    }

    fn read_body_lf(src: &mut BytesMut) -> Poll<Result<ChunkedState, io::Error>> {
        match try_next_byte!(src) {
            b'\n' => Poll::Ready(Ok(Size)),
            _ => invalid_input("invalid chunk body LF"),
        }
    }
}
