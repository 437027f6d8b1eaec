use futures::StreamExt;
use http::StatusCode;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::select;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::codec::RequestDecoder;
use crate::connection::{ConnectionState, ConnectionWriter, Dispatcher, MessageAccumulator};
use crate::handler::Channel;
use crate::protocol::{HttpError, ParseError, ProtocolError, Request, RequestEvent, Response};

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Drives one HTTP/1.x connection, one request at a time.
///
/// Each cycle reads events until the [`MessageAccumulator`] completes a request, hands it to
/// the [`Dispatcher`], and writes the response with the [`ConnectionWriter`]. While a request
/// is being dispatched the read half is still watched. End of input there means the response
/// is the last one on this connection. Any further request data is a [`ProtocolError`] that
/// aborts the controller and closes the connection without a response.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
#[derive(Debug)]
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    writer: ConnectionWriter<W>,
    accumulator: MessageAccumulator,
    state: ConnectionState,
    shutdown: CancellationToken,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), READ_BUFFER_SIZE),
            writer: ConnectionWriter::new(writer),
            accumulator: MessageAccumulator::new(),
            state: ConnectionState::Idle,
            shutdown: CancellationToken::new(),
        }
    }

    /// Limits the accumulated body size; larger requests are answered with `413`.
    #[must_use]
    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.accumulator = MessageAccumulator::with_max_body_size(max_body_size);
        self
    }

    /// Once `shutdown` is cancelled, an idle connection closes and an in-flight request is
    /// answered with `connection: close`.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Serves requests until the connection closes.
    ///
    /// Returns `Ok` when the peer goes away or a non-persistent response was written, and
    /// the error that ended the connection otherwise.
    pub async fn process(mut self, dispatcher: &Dispatcher) -> Result<(), HttpError> {
        loop {
            if self.process_request(dispatcher).await?.is_closing() {
                return Ok(());
            }
        }
    }

    /// Runs one read, dispatch, write cycle and returns the state it left the connection in:
    /// [`ConnectionState::Idle`] when another request may follow, [`ConnectionState::Closing`]
    /// otherwise.
    pub async fn process_request(&mut self, dispatcher: &Dispatcher) -> Result<ConnectionState, HttpError> {
        if self.state.is_closing() {
            return Ok(ConnectionState::Closing);
        }

        match self.do_process_request(dispatcher).await {
            Ok(ConnectionState::Idle) => {
                self.state = ConnectionState::Idle;
                Ok(ConnectionState::Idle)
            }
            Ok(_) => {
                self.close().await;
                Ok(ConnectionState::Closing)
            }
            Err(e) => {
                self.close().await;
                Err(e)
            }
        }
    }

    async fn do_process_request(&mut self, dispatcher: &Dispatcher) -> Result<ConnectionState, HttpError> {
        let Some(request) = self.read_request().await? else {
            return Ok(ConnectionState::Closing);
        };

        let keep_alive = request.keep_alive();
        trace!(method = %request.method(), uri = %request.uri(), keep_alive, "dispatching request");

        let (response, read_closed) = {
            let dispatch = dispatcher.dispatch(request);
            tokio::pin!(dispatch);

            select! {
                biased;

                response = &mut dispatch => (response, false),

                next = self.framed_read.next() => match next {
                    None => {
                        debug!("peer stopped sending during dispatch, closing after the response");
                        ((&mut dispatch).await, true)
                    }
                    // dropping `dispatch` aborts the controller
                    Some(Ok(RequestEvent::Head(_))) => return Err(ProtocolError::HeadWhileInFlight.into()),
                    Some(Ok(_)) => return Err(ProtocolError::DataAfterEnd.into()),
                    Some(Err(e)) => return Err(e.into()),
                },
            }
        };

        let keep_alive = keep_alive && !read_closed && !self.shutdown.is_cancelled();
        self.state = ConnectionState::Writing;
        self.writer.write_response(response, keep_alive).await?;

        Ok(if keep_alive { ConnectionState::Idle } else { ConnectionState::Closing })
    }

    /// Reads events until a request is complete.
    ///
    /// Returns `Ok(None)` when the peer closed between requests or shutdown was requested
    /// while idle.
    async fn read_request(&mut self) -> Result<Option<Request>, HttpError> {
        loop {
            let next = if self.accumulator.is_idle() {
                self.state = if self.framed_read.read_buffer().is_empty() {
                    ConnectionState::Idle
                } else {
                    ConnectionState::AccumulatingHead
                };

                select! {
                    biased;

                    next = self.framed_read.next() => next,

                    () = self.shutdown.cancelled(), if self.state.is_idle() => {
                        info!("shutdown requested, closing idle connection");
                        return Ok(None);
                    }
                }
            } else {
                self.framed_read.next().await
            };

            let event = match next {
                Some(Ok(event)) => event,
                Some(Err(e)) => return Err(self.reject_malformed(e).await),
                None => {
                    if !self.accumulator.is_idle() {
                        debug!("peer closed the connection in the middle of a request");
                        self.accumulator.reset();
                    }
                    return Ok(None);
                }
            };

            let expect_continue = matches!(&event, RequestEvent::Head(head) if head.expect_continue());
            let is_head = event.is_head();

            match self.accumulator.accumulate(event) {
                Ok(Some(request)) => {
                    self.state = ConnectionState::Dispatching;
                    return Ok(Some(request));
                }
                Ok(None) if is_head => {
                    self.state = ConnectionState::AccumulatingBody;
                    if expect_continue {
                        self.writer.write_continue().await?;
                    }
                }
                Ok(None) => {}
                Err(e @ ProtocolError::BodyTooLarge { .. }) => {
                    warn!(cause = %e, "request body too large, answering 413");
                    self.reject(StatusCode::PAYLOAD_TOO_LARGE).await;
                    return Err(e.into());
                }
                Err(e) => {
                    warn!(cause = %e, "protocol violation, closing connection");
                    return Err(e.into());
                }
            }
        }
    }

    async fn reject_malformed(&mut self, e: ParseError) -> HttpError {
        self.accumulator.reset();
        // a read failure leaves no one to answer
        if !matches!(e, ParseError::Io { .. }) {
            warn!(cause = %e, "malformed request, answering 400");
            self.reject(StatusCode::BAD_REQUEST).await;
        }
        e.into()
    }

    async fn reject(&mut self, status: StatusCode) {
        self.state = ConnectionState::Writing;
        if let Err(e) = self.writer.write_response(Response::new(status), false).await {
            debug!(cause = %e, status = status.as_u16(), "failed to write rejection");
        }
    }

    /// Shuts the write half down and drops any partial request.
    async fn close(&mut self) {
        self.state = ConnectionState::Closing;
        self.accumulator.reset();
        if let Err(e) = self.writer.close().await {
            debug!(cause = %e, "failed to close connection");
        }
    }
}

/// Runs the channel's prepare step, then serves `connection` with the channel's dispatcher.
///
/// When prepare fails the connection is closed before any request is read.
pub async fn serve_connection<R, W>(mut connection: HttpConnection<R, W>, channel: &Channel) -> Result<(), HttpError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if let Err(e) = channel.prepare().await {
        warn!(cause = %e, "failed to prepare channel, closing connection");
        connection.close().await;
        return Err(HttpError::prepare(e));
    }

    connection.process(channel.dispatcher()).await
}
