use futures::SinkExt;
use http::header::CONNECTION;
use http::HeaderValue;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::FramedWrite;
use tracing::{trace, warn};

use crate::codec::{forbids_body, ResponseEncoder};
use crate::protocol::{Response, ResponseFrame, SendError};

const KEEP_ALIVE: HeaderValue = HeaderValue::from_static("keep-alive");
const CLOSE: HeaderValue = HeaderValue::from_static("close");

/// Writes [`Response`]s onto the write half of a connection.
///
/// Every response is framed with `content-length` and carries a `connection` header
/// decided from the request's keep-alive preference. A non-persistent response is
/// flushed and the write half shut down before [`ConnectionWriter::write_response`] returns.
#[derive(Debug)]
pub struct ConnectionWriter<W> {
    framed_write: FramedWrite<W, ResponseEncoder>,
    closed: bool,
}

impl<W> ConnectionWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self { framed_write: FramedWrite::new(writer, ResponseEncoder::new()), closed: false }
    }

    pub async fn write_response(&mut self, response: Response, keep_alive: bool) -> Result<(), SendError> {
        if self.closed {
            return Err(SendError::invalid_frame("response written after the connection was closed"));
        }

        let (mut head, mut body, trailers) = response.into_parts();
        if trailers.is_some() {
            warn!("dropping response trailers, content-length framed responses can't carry them");
        }
        if forbids_body(head.status()) && !body.is_empty() {
            warn!(status = head.status().as_u16(), "dropping body of a response that can't carry one");
            body.clear();
        }

        head.headers_mut().insert(CONNECTION, if keep_alive { KEEP_ALIVE } else { CLOSE });

        let status = head.status();
        let length = body.len() as u64;
        self.framed_write.feed(ResponseFrame::Head(head, length)).await?;
        if !body.is_empty() {
            self.framed_write.feed(ResponseFrame::Body(body)).await?;
        }
        // send flushes the head and body together
        self.framed_write.send(ResponseFrame::End).await?;
        trace!(status = status.as_u16(), length, keep_alive, "wrote response");

        if !keep_alive {
            self.close().await?;
        }
        Ok(())
    }

    /// Writes the interim `100 Continue` response.
    pub async fn write_continue(&mut self) -> Result<(), SendError> {
        let writer = self.framed_write.get_mut();
        writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await?;
        writer.flush().await?;
        trace!("sent 100 continue");
        Ok(())
    }

    /// Flushes anything buffered and shuts down the write half. Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<(), SendError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        SinkExt::<ResponseFrame>::close(&mut self.framed_write).await
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_keep_alive_response() {
        let (client, server) = tokio::io::duplex(4096);
        let mut writer = ConnectionWriter::new(server);

        let response = Response::json(StatusCode::OK, &serde_json::json!({"id": 1}));
        writer.write_response(response, true).await.unwrap();
        assert!(!writer.is_closed());
        drop(writer);

        let mut received = String::new();
        let mut client = client;
        client.read_to_string(&mut received).await.unwrap();

        assert!(received.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(received.contains("content-type: application/json\r\n"));
        assert!(received.contains("connection: keep-alive\r\n"));
        assert!(received.contains("content-length: 8\r\n"));
        assert!(received.ends_with("\r\n\r\n{\"id\":1}"));
    }

    #[tokio::test]
    async fn test_close_after_non_persistent_response() {
        let (mut client, server) = tokio::io::duplex(4096);
        let mut writer = ConnectionWriter::new(server);

        writer.write_response(Response::new(StatusCode::NO_CONTENT), false).await.unwrap();
        assert!(writer.is_closed());

        // the write half is shut down, so the peer sees eof while the writer is still alive
        let mut received = String::new();
        client.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "HTTP/1.1 204 No Content\r\nconnection: close\r\n\r\n");

        let again = writer.write_response(Response::new(StatusCode::OK), true).await;
        assert!(matches!(again, Err(SendError::InvalidFrame { .. })));
    }

    #[tokio::test]
    async fn test_controller_connection_header_is_overridden() {
        let (mut client, server) = tokio::io::duplex(4096);
        let mut writer = ConnectionWriter::new(server);

        let response = Response::new(StatusCode::OK).header(CONNECTION, HeaderValue::from_static("upgrade"));
        writer.write_response(response, false).await.unwrap();

        let mut received = String::new();
        client.read_to_string(&mut received).await.unwrap();
        assert!(received.contains("connection: close\r\n"));
        assert!(!received.contains("upgrade"));
    }

    #[tokio::test]
    async fn test_no_content_body_is_dropped() {
        let (mut client, server) = tokio::io::duplex(4096);
        let mut writer = ConnectionWriter::new(server);

        writer.write_response(Response::text(StatusCode::NO_CONTENT, "ignored"), false).await.unwrap();

        let mut received = String::new();
        client.read_to_string(&mut received).await.unwrap();
        assert!(received.starts_with("HTTP/1.1 204 No Content\r\n"));
        assert!(!received.contains("content-length"));
        assert!(received.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_write_continue() {
        let (mut client, server) = tokio::io::duplex(4096);
        let mut writer = ConnectionWriter::new(server);

        writer.write_continue().await.unwrap();
        writer.close().await.unwrap();

        let mut received = String::new();
        client.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "HTTP/1.1 100 Continue\r\n\r\n");
    }
}
