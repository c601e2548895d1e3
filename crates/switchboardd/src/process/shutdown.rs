//! Termination signals that end the serving phase.

use std::io;
use std::sync::{Mutex, PoisonError};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until shutdown should proceed.
    ///
    /// # Errors
    ///
    /// Returns an error when the notification mechanism fails.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Waits for `SIGTERM`, `SIGINT`, `SIGQUIT` or `SIGHUP`.
///
/// Handlers are registered by [`SystemShutdownSignal::install`], so a signal
/// that arrives while the daemon is still starting is not lost.
pub struct SystemShutdownSignal {
    signals: Mutex<Signals>,
    handle: Handle,
}

impl SystemShutdownSignal {
    /// Registers the termination signal handlers.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Install`] if registration fails.
    pub fn install() -> Result<Self, ShutdownError> {
        let signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        let handle = signals.handle();
        Ok(Self {
            signals: Mutex::new(signals),
            handle,
        })
    }

    /// Releases [`ShutdownSignal::wait`] without a signal.
    pub fn trigger(&self) {
        self.handle.close();
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals = self.signals.lock().unwrap_or_else(PoisonError::into_inner);
        match signals.forever().next() {
            Some(signal) => info!(target: PROCESS_TARGET, signal, "shutdown signal received"),
            None => info!(target: PROCESS_TARGET, "shutdown requested"),
        }
        Ok(())
    }
}
