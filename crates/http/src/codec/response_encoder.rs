use crate::codec::body::LengthEncoder;
use crate::codec::header::HeaderEncoder;
use crate::protocol::{ResponseFrame, SendError};
use bytes::BytesMut;
use tokio_util::codec::Encoder;
use tracing::error;

/// Encodes [`ResponseFrame`]s, enforcing `Head`, `Body*`, `End` order for every response.
///
/// `payload_encoder` is `Some` between a head and its end.
#[derive(Debug)]
pub struct ResponseEncoder {
    header_encoder: HeaderEncoder,
    payload_encoder: Option<LengthEncoder>,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Default for ResponseEncoder {
    fn default() -> Self {
        Self { header_encoder: HeaderEncoder, payload_encoder: None }
    }
}

impl Encoder<ResponseFrame> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: ResponseFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            ResponseFrame::Head(head, length) => {
                if self.payload_encoder.is_some() {
                    error!("expect body or end frame but receive response head");
                    return Err(SendError::invalid_frame("response head while another response is open"));
                }

                self.payload_encoder = Some(LengthEncoder::new(length));
                self.header_encoder.encode((head, length), dst)
            }

            ResponseFrame::Body(bytes) => match &mut self.payload_encoder {
                Some(encoder) => encoder.encode(bytes, dst),
                None => {
                    error!("expect response head but receive body frame");
                    Err(SendError::invalid_frame("body frame without response head"))
                }
            },

            ResponseFrame::End => match self.payload_encoder.take() {
                Some(encoder) if encoder.is_finish() => Ok(()),
                Some(_) => Err(SendError::invalid_frame("response body shorter than its content-length")),
                None => {
                    error!("expect response head but receive end frame");
                    Err(SendError::invalid_frame("end frame without response head"))
                }
            },
        }
    }
}
