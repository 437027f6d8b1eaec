//! Turns raw connection bytes into [`RequestEvent`]s.
//!
//! The decoder alternates between two phases: [`HeaderDecoder`] until a head is complete,
//! then a [`PayloadDecoder`] chosen from that head until the body ends. Each message yields
//! one `Head`, zero or more `BodyChunk`s and exactly one `End`, after which the decoder is
//! ready for the next message on the same connection.

use crate::codec::body::{PayloadDecoder, PayloadItem};
use crate::codec::header::HeaderDecoder;
use crate::protocol::{ParseError, RequestEvent};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Streaming decoder for HTTP/1.x requests.
///
/// `payload_decoder` is `None` while a head is being parsed.
#[derive(Debug)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { header_decoder: HeaderDecoder, payload_decoder: None }
    }
}

impl Decoder for RequestDecoder {
    type Item = RequestEvent;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let event = match payload_decoder.decode(src)? {
                Some(PayloadItem::Chunk(bytes)) => Some(RequestEvent::BodyChunk(bytes)),
                Some(PayloadItem::Eof(trailers)) => {
                    self.payload_decoder.take();
                    Some(RequestEvent::End(trailers))
                }
                None => None,
            };

            return Ok(event);
        }

        let event = match self.header_decoder.decode(src)? {
            Some((head, payload_size)) => {
                self.payload_decoder = Some(payload_size.into());
                Some(RequestEvent::Head(head))
            }
            None => None,
        };

        Ok(event)
    }
}
