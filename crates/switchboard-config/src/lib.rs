//! Layered configuration shared by the switchboard daemon and its tests.
//!
//! Values are merged from built-in defaults, an optional TOML file
//! (`--config-path` or `SWITCHBOARD_CONFIG_PATH`), `SWITCHBOARD_*` environment
//! variables and command-line flags, with later layers taking precedence.

mod defaults;
mod logging;
mod socket;

use std::sync::Arc;
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_CALL_TIMEOUT_MS, DEFAULT_LOG_FILTER, DEFAULT_MAX_REQUEST_BYTES, DEFAULT_ROUTE_PREFIX,
    DEFAULT_TCP_PORT, default_call_timeout_ms, default_log_filter, default_log_filter_string,
    default_log_format, default_max_request_bytes, default_route_prefix, default_socket_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Runtime configuration for the switchboard daemon.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SWITCHBOARD")]
pub struct Config {
    /// Endpoint the daemon listens on.
    #[ortho_config(default = default_socket_endpoint())]
    pub listen_socket: SocketEndpoint,
    /// `tracing` filter directive, e.g. `info` or `switchboard=debug`.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log events.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// First segment every request path must carry.
    #[ortho_config(default = default_route_prefix())]
    pub route_prefix: String,
    /// Upper bound on a single request line, in bytes.
    #[ortho_config(default = default_max_request_bytes())]
    pub max_request_bytes: usize,
    /// Deadline applied to each call, in milliseconds. `0` disables it.
    #[ortho_config(default = default_call_timeout_ms())]
    pub call_timeout_ms: u64,
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns the loader error when a layer cannot be read or merged.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load_from_iter(std::env::args_os())
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// The first item is treated as the program name.
    ///
    /// # Errors
    ///
    /// Returns the loader error when a layer cannot be read or merged.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Endpoint the daemon listens on.
    #[must_use]
    pub fn listen_socket(&self) -> &SocketEndpoint {
        &self.listen_socket
    }

    /// Log filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Required route prefix.
    #[must_use]
    pub fn route_prefix(&self) -> &str {
        &self.route_prefix
    }

    /// Request size limit in bytes.
    #[must_use]
    pub fn max_request_bytes(&self) -> usize {
        self.max_request_bytes
    }

    /// Per-call deadline, or `None` when disabled.
    #[must_use]
    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_ms > 0).then(|| Duration::from_millis(self.call_timeout_ms))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_socket: default_socket_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            route_prefix: default_route_prefix(),
            max_request_bytes: default_max_request_bytes(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.log_filter(), "info");
        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(config.route_prefix(), "HPC");
        assert_eq!(config.max_request_bytes(), 1024 * 1024);
        assert_eq!(config.call_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_timeout_disables_deadline() {
        let config = Config {
            call_timeout_ms: 0,
            ..Config::default()
        };
        assert_eq!(config.call_timeout(), None);
    }
}
