use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use aqueduct_http::connection::{HttpConnection, serve_connection};
use aqueduct_http::handler::{Channel, ChannelFactory};
use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::logging;

pub struct ServerBuilder {
    config: ServerConfig,
    channel_factory: Option<Arc<dyn ChannelFactory>>,
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder").field("config", &self.config).finish_non_exhaustive()
    }
}

impl ServerBuilder {
    fn new() -> Self {
        Self { config: ServerConfig::default(), channel_factory: None }
    }

    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Asks `channel_factory` for a fresh [`Channel`] on every accepted connection.
    #[must_use]
    pub fn channel_factory(mut self, channel_factory: impl ChannelFactory) -> Self {
        self.channel_factory = Some(Arc::new(channel_factory));
        self
    }

    /// Shares one [`Channel`] between all connections.
    #[must_use]
    pub fn channel(self, channel: Channel) -> Self {
        self.channel_factory(channel)
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let channel_factory = self.channel_factory.ok_or(ServerBuildError::MissingChannelFactory)?;
        Ok(Server { config: self.config, channel_factory })
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("channel factory must be set")]
    MissingChannelFactory,
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to resolve {host}:{port}: {source}")]
    Resolve { host: String, port: u16, source: io::Error },

    #[error("no socket address found for {host}:{port}")]
    NoAddress { host: String, port: u16 },

    #[error("failed to listen on {address}: {source}")]
    Bind { address: SocketAddr, source: io::Error },

    #[error("failed to build runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error("failed to install log subscriber: {0}")]
    Logging(#[from] SetGlobalDefaultError),
}

/// Accepts TCP connections and serves each one with a channel from its factory.
pub struct Server {
    config: ServerConfig,
    channel_factory: Arc<dyn ChannelFactory>,
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Binds the listener and starts accepting on the current runtime.
    ///
    /// The returned handle reports the bound address and shuts the server down.
    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let (listener, local_addr) = self.bind().await?;
        info!(%local_addr, "start listening");

        let handle = ServerHandle {
            local_addr,
            shutdown: CancellationToken::new(),
            force: CancellationToken::new(),
            tracker: TaskTracker::new(),
            shutdown_timeout: self.config.get_shutdown_timeout(),
        };

        let acceptor = Acceptor {
            listener,
            channel_factory: self.channel_factory,
            max_body_size: self.config.get_max_body_size(),
            shutdown: handle.shutdown.clone(),
            force: handle.force.clone(),
            tracker: handle.tracker.clone(),
        };
        handle.tracker.spawn(acceptor.run());

        Ok(handle)
    }

    /// Installs logging, builds a multi-thread runtime and serves until ctrl-c, then shuts
    /// down gracefully.
    pub fn run(self) -> Result<(), ServerError> {
        logging::init(self.config.get_log_level())?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.get_worker_threads())
            .enable_all()
            .build()
            .map_err(ServerError::Runtime)?;

        runtime.block_on(async move {
            let handle = self.start().await?;
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("received ctrl-c, shutting down"),
                Err(e) => error!(cause = %e, "failed to listen for ctrl-c, shutting down"),
            }
            handle.shutdown().await;
            Ok(())
        })
    }

    async fn bind(&self) -> Result<(TcpListener, SocketAddr), ServerError> {
        let host = self.config.get_host();
        let port = self.config.get_port();

        let address = tokio::net::lookup_host((host, port))
            .await
            .map_err(|source| ServerError::Resolve { host: host.to_owned(), port, source })?
            .next()
            .ok_or_else(|| ServerError::NoAddress { host: host.to_owned(), port })?;

        let bind_error = |source: io::Error| ServerError::Bind { address, source };
        let socket = if address.is_ipv4() { TcpSocket::new_v4() } else { TcpSocket::new_v6() }.map_err(bind_error)?;
        socket.set_reuseaddr(true).map_err(bind_error)?;
        socket.bind(address).map_err(bind_error)?;
        let listener = socket.listen(self.config.get_backlog()).map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;
        Ok((listener, local_addr))
    }
}

struct Acceptor {
    listener: TcpListener,
    channel_factory: Arc<dyn ChannelFactory>,
    max_body_size: usize,
    shutdown: CancellationToken,
    force: CancellationToken,
    tracker: TaskTracker,
}

impl Acceptor {
    async fn run(self) {
        loop {
            let (tcp_stream, remote_addr) = tokio::select! {
                biased;

                () = self.shutdown.cancelled() => {
                    info!("stop accepting connections");
                    return;
                }

                accepted = self.listener.accept() => match accepted {
                    Ok(stream_and_addr) => stream_and_addr,
                    Err(e) => {
                        warn!(cause = %e, "failed to accept");
                        continue;
                    }
                },
            };

            if let Err(e) = tcp_stream.set_nodelay(true) {
                warn!(cause = %e, %remote_addr, "failed to set TCP_NODELAY");
            }

            let channel = self.channel_factory.new_channel();
            let connection = serve(tcp_stream, remote_addr, channel, self.max_body_size, self.shutdown.clone());
            let force = self.force.clone();
            self.tracker.spawn(async move {
                tokio::select! {
                    () = force.cancelled() => debug!(%remote_addr, "connection cancelled by forced shutdown"),
                    () = connection => {}
                }
            });
        }
    }
}

async fn serve(
    tcp_stream: TcpStream,
    remote_addr: SocketAddr,
    channel: Channel,
    max_body_size: usize,
    shutdown: CancellationToken,
) {
    let (reader, writer) = tcp_stream.into_split();
    let connection = HttpConnection::new(reader, writer).with_max_body_size(max_body_size).with_shutdown(shutdown);

    match serve_connection(connection, &channel).await {
        Ok(()) => debug!(%remote_addr, "finished process, connection shutdown"),
        Err(e) => warn!(cause = %e, %remote_addr, "connection closed with error"),
    }
}

/// Controls a started [`Server`].
///
/// Clones refer to the same server.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    force: CancellationToken,
    tracker: TaskTracker,
    shutdown_timeout: Duration,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting and waits for open connections to finish.
    ///
    /// Idle connections close at once and in-flight requests are answered with
    /// `connection: close`. Connections still open after the shutdown timeout are
    /// cancelled. Calling this again, or from a clone, waits for the same shutdown.
    pub async fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!(local_addr = %self.local_addr, "shutting down");
        }
        self.shutdown.cancel();
        self.tracker.close();

        if tokio::time::timeout(self.shutdown_timeout, self.tracker.wait()).await.is_err() {
            warn!(remaining = self.tracker.len(), "shutdown timeout elapsed, cancelling open connections");
            self.force.cancel();
            self.tracker.wait().await;
        }
    }

    /// Resolves once the server has shut down.
    pub async fn closed(&self) {
        self.tracker.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqueduct_http::handler::{controller_fn, prepare_fn};
    use aqueduct_http::protocol::{BoxError, Request, Response};
    use http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn test_config() -> ServerConfig {
        ServerConfig::new().host("127.0.0.1").port(0).shutdown_timeout(Duration::from_secs(5))
    }

    fn hello_channel() -> Channel {
        Channel::new(controller_fn(|request: Request| async move {
            Ok::<_, BoxError>(Response::text(StatusCode::OK, format!("hello {}", request.uri().path())))
        }))
    }

    fn slow_channel(delay: Duration) -> Channel {
        Channel::new(controller_fn(move |_request: Request| async move {
            tokio::time::sleep(delay).await;
            Ok::<_, BoxError>(Response::text(StatusCode::OK, "done"))
        }))
    }

    async fn start(channel_factory: impl ChannelFactory, config: ServerConfig) -> ServerHandle {
        Server::builder().config(config).channel_factory(channel_factory).build().unwrap().start().await.unwrap()
    }

    async fn request(addr: SocketAddr, raw: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_build_without_channel_factory() {
        let result = Server::builder().config(test_config()).build();

        assert!(matches!(result, Err(ServerBuildError::MissingChannelFactory)));
    }

    #[tokio::test]
    async fn test_serves_request() {
        let handle = start(hello_channel(), test_config()).await;

        let response = request(handle.local_addr(), "GET /world HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("connection: close\r\n"));
        assert!(response.ends_with("\r\n\r\nhello /world"));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_factory_called_per_connection() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let factory = move || {
            counter.fetch_add(1, Ordering::SeqCst);
            hello_channel()
        };
        let handle = start(factory, test_config()).await;

        for _ in 0..2 {
            let response = request(handle.local_addr(), "GET / HTTP/1.0\r\n\r\n").await;
            assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        }

        assert_eq!(created.load(Ordering::SeqCst), 2);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_prepare_failure_closes_without_response() {
        let channel = Channel::builder(controller_fn(|_request: Request| async {
            Ok::<_, BoxError>(Response::new(StatusCode::OK))
        }))
        .prepare(prepare_fn(|| async { Err::<(), _>("not today") }))
        .build();
        let handle = start(channel, test_config()).await;

        let mut stream = TcpStream::connect(handle.local_addr()).await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();

        assert!(buf.is_empty());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_twice_and_stop_accepting() {
        let handle = start(hello_channel(), test_config()).await;
        let addr = handle.local_addr();

        handle.shutdown().await;
        handle.clone().shutdown().await;
        handle.closed().await;

        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_closes_idle_connection() {
        let handle = start(hello_channel(), test_config()).await;
        let mut stream = TcpStream::connect(handle.local_addr()).await.unwrap();

        stream.write_all(b"GET /a HTTP/1.1\r\nHost: localhost\r\n\r\n").await.unwrap();
        let mut head = vec![0u8; 17];
        stream.read_exact(&mut head).await.unwrap();
        assert_eq!(&head[..], b"HTTP/1.1 200 OK\r\n");

        tokio::time::timeout(Duration::from_secs(2), handle.shutdown()).await.unwrap();

        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).await.unwrap();
        let rest = String::from_utf8(rest).unwrap();
        assert!(rest.contains("connection: keep-alive\r\n"));
        assert!(rest.ends_with("hello /a"));
    }

    #[tokio::test]
    async fn test_shutdown_drains_in_flight_request() {
        let handle = start(slow_channel(Duration::from_millis(300)), test_config()).await;
        let mut stream = TcpStream::connect(handle.local_addr()).await.unwrap();

        stream.write_all(b"GET /slow HTTP/1.1\r\nHost: localhost\r\n\r\n").await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let shutdown = tokio::spawn({
            let handle = handle.clone();
            async move { handle.shutdown().await }
        });

        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        let response = String::from_utf8(buf).unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("connection: close\r\n"));
        assert!(response.ends_with("done"));
        shutdown.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_timeout_cancels_connections() {
        let config = test_config().shutdown_timeout(Duration::from_millis(100));
        let handle = start(slow_channel(Duration::from_secs(60)), config).await;
        let mut stream = TcpStream::connect(handle.local_addr()).await.unwrap();

        stream.write_all(b"GET /stuck HTTP/1.1\r\nHost: localhost\r\n\r\n").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        tokio::time::timeout(Duration::from_secs(5), handle.shutdown()).await.unwrap();

        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf).await;
        assert!(buf.is_empty());
    }
}
