//! Server settings, built with chained setters or read from `AQUEDUCT_*` environment
//! variables.
//!
//! | variable                      | default                  |
//! |-------------------------------|--------------------------|
//! | `AQUEDUCT_HOST`               | `::1`                    |
//! | `AQUEDUCT_PORT`               | `8080`                   |
//! | `AQUEDUCT_WORKER_THREADS`     | available parallelism    |
//! | `AQUEDUCT_BACKLOG`            | `256`                    |
//! | `AQUEDUCT_SHUTDOWN_TIMEOUT_MS`| `30000`                  |
//! | `AQUEDUCT_MAX_BODY_SIZE`      | `8388608`                |
//! | `AQUEDUCT_LOG`                | `info`                   |

use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

use aqueduct_http::connection::DEFAULT_MAX_BODY_SIZE;
use thiserror::Error;
use tracing::Level;

pub const DEFAULT_HOST: &str = "::1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BACKLOG: u32 = 256;
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

const ENV_HOST: &str = "AQUEDUCT_HOST";
const ENV_PORT: &str = "AQUEDUCT_PORT";
const ENV_WORKER_THREADS: &str = "AQUEDUCT_WORKER_THREADS";
const ENV_BACKLOG: &str = "AQUEDUCT_BACKLOG";
const ENV_SHUTDOWN_TIMEOUT_MS: &str = "AQUEDUCT_SHUTDOWN_TIMEOUT_MS";
const ENV_MAX_BODY_SIZE: &str = "AQUEDUCT_MAX_BODY_SIZE";
const ENV_LOG: &str = "AQUEDUCT_LOG";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue { key: &'static str, value: String, reason: String },
}

impl ConfigError {
    fn invalid_value(key: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::InvalidValue { key, value: value.to_owned(), reason: reason.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    host: String,
    port: u16,
    worker_threads: usize,
    backlog: u32,
    shutdown_timeout: Duration,
    max_body_size: usize,
    log_level: Level,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            worker_threads: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            backlog: DEFAULT_BACKLOG,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            log_level: Level::INFO,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the process environment. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Same as [`from_env`](Self::from_env) over an explicit set of variables.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            let value = value.as_ref();
            match key.as_ref() {
                ENV_HOST => config.host = value.to_owned(),
                ENV_PORT => config.port = parse(ENV_PORT, value)?,
                ENV_WORKER_THREADS => config.worker_threads = parse::<NonZeroUsize>(ENV_WORKER_THREADS, value)?.get(),
                ENV_BACKLOG => config.backlog = parse(ENV_BACKLOG, value)?,
                ENV_SHUTDOWN_TIMEOUT_MS => {
                    config.shutdown_timeout = Duration::from_millis(parse(ENV_SHUTDOWN_TIMEOUT_MS, value)?);
                }
                ENV_MAX_BODY_SIZE => config.max_body_size = parse(ENV_MAX_BODY_SIZE, value)?,
                ENV_LOG => config.log_level = parse(ENV_LOG, value)?,
                _ => {}
            }
        }
        Ok(config)
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Values below one are raised to one.
    #[must_use]
    pub fn worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads.max(1);
        self
    }

    #[must_use]
    pub fn backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    /// How long shutdown waits for in-flight requests before cancelling them.
    #[must_use]
    pub fn shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    #[must_use]
    pub fn max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    #[must_use]
    pub fn log_level(mut self, log_level: Level) -> Self {
        self.log_level = log_level;
        self
    }

    pub fn get_host(&self) -> &str {
        &self.host
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn get_worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn get_backlog(&self) -> u32 {
        self.backlog
    }

    pub fn get_shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    pub fn get_max_body_size(&self) -> usize {
        self.max_body_size
    }

    pub fn get_log_level(&self) -> Level {
        self.log_level
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::invalid_value(key, value, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();

        assert_eq!(config.get_host(), "::1");
        assert_eq!(config.get_port(), 8080);
        assert_eq!(config.get_backlog(), 256);
        assert_eq!(config.get_max_body_size(), 8 * 1024 * 1024);
        assert_eq!(config.get_log_level(), Level::INFO);
        assert!(config.get_worker_threads() >= 1);
    }

    #[test]
    fn test_chained_setters() {
        let config = ServerConfig::new()
            .host("127.0.0.1")
            .port(0)
            .worker_threads(0)
            .backlog(16)
            .shutdown_timeout(Duration::from_millis(250))
            .max_body_size(1024)
            .log_level(Level::DEBUG);

        assert_eq!(config.get_host(), "127.0.0.1");
        assert_eq!(config.get_port(), 0);
        assert_eq!(config.get_worker_threads(), 1);
        assert_eq!(config.get_backlog(), 16);
        assert_eq!(config.get_shutdown_timeout(), Duration::from_millis(250));
        assert_eq!(config.get_max_body_size(), 1024);
        assert_eq!(config.get_log_level(), Level::DEBUG);
    }

    #[test]
    fn test_from_vars() {
        let config = ServerConfig::from_vars([
            ("AQUEDUCT_HOST", "0.0.0.0"),
            ("AQUEDUCT_PORT", "9000"),
            ("AQUEDUCT_WORKER_THREADS", "3"),
            ("AQUEDUCT_BACKLOG", "1024"),
            ("AQUEDUCT_SHUTDOWN_TIMEOUT_MS", "1500"),
            ("AQUEDUCT_MAX_BODY_SIZE", " 4096 "),
            ("AQUEDUCT_LOG", "warn"),
            ("PATH", "/usr/bin"),
        ])
        .unwrap();

        assert_eq!(config.get_host(), "0.0.0.0");
        assert_eq!(config.get_port(), 9000);
        assert_eq!(config.get_worker_threads(), 3);
        assert_eq!(config.get_backlog(), 1024);
        assert_eq!(config.get_shutdown_timeout(), Duration::from_millis(1500));
        assert_eq!(config.get_max_body_size(), 4096);
        assert_eq!(config.get_log_level(), Level::WARN);
    }

    #[test]
    fn test_missing_vars_keep_defaults() {
        let config = ServerConfig::from_vars(Vec::<(String, String)>::new()).unwrap();

        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_invalid_port() {
        let error = ServerConfig::from_vars([("AQUEDUCT_PORT", "http")]).unwrap_err();

        let ConfigError::InvalidValue { key, value, .. } = error;
        assert_eq!(key, "AQUEDUCT_PORT");
        assert_eq!(value, "http");
    }

    #[test]
    fn test_zero_worker_threads_is_invalid() {
        let error = ServerConfig::from_vars([("AQUEDUCT_WORKER_THREADS", "0")]).unwrap_err();

        assert!(matches!(error, ConfigError::InvalidValue { key: "AQUEDUCT_WORKER_THREADS", .. }));
    }

    #[test]
    fn test_invalid_log_level() {
        let error = ServerConfig::from_vars([("AQUEDUCT_LOG", "loud")]).unwrap_err();

        assert!(error.to_string().starts_with("invalid value \"loud\" for AQUEDUCT_LOG: "));
    }
}
