//! Error types for socket listener operations.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced while binding, running or stopping the socket listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The endpoint could not be bound.
    #[error("failed to bind {endpoint}: {source}")]
    Bind {
        /// Configured endpoint.
        endpoint: String,
        /// OS error.
        #[source]
        source: io::Error,
    },
    /// Unix sockets are not available on this platform.
    #[cfg(not(unix))]
    #[error("unix sockets are unsupported for endpoint {endpoint}")]
    UnsupportedUnix {
        /// Configured endpoint.
        endpoint: String,
    },
    /// Another process is serving on the socket path.
    #[cfg(unix)]
    #[error("unix socket {path} is already in use")]
    UnixInUse {
        /// Socket path.
        path: String,
    },
    /// The socket path exists and is not a socket.
    #[cfg(unix)]
    #[error("unix socket path {path} is not a socket")]
    UnixNotSocket {
        /// Socket path.
        path: String,
    },
    /// A leftover socket file could not be inspected or removed.
    #[cfg(unix)]
    #[error("failed to clear stale unix socket {path}: {source}")]
    UnixStale {
        /// Socket path.
        path: String,
        /// OS error.
        #[source]
        source: io::Error,
    },
    /// The accept thread could not be started.
    #[error("failed to spawn accept thread: {source}")]
    Spawn {
        /// OS error.
        #[source]
        source: io::Error,
    },
    /// The accept loop panicked.
    #[error("listener thread panicked")]
    ThreadPanic,
    /// Connections were still being served when the drain period ended.
    #[error("{active} connection(s) still open after {timeout:?}")]
    DrainTimeout {
        /// Connections left running.
        active: usize,
        /// Drain period that elapsed.
        timeout: Duration,
    },
}
