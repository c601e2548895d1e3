//! Defines the unified error surface for daemon launch and supervision.

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::transport::ListenerError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching or supervising the daemon process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrap failed before the listener was bound.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The socket listener could not be bound, or connections outlived the
    /// drain period.
    #[error("socket listener failed: {source}")]
    Listener {
        /// Underlying listener error.
        #[from]
        source: ListenerError,
    },
    /// Waiting for the shutdown signal failed.
    #[error("shutdown handling failed: {source}")]
    Shutdown {
        /// Underlying signal error.
        #[from]
        source: ShutdownError,
    },
}
