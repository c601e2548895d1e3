//! Per-request call context.
//!
//! The transport builds a [`CallContext`] for each inbound request and lends
//! it to the dispatcher for the duration of one invocation. The dispatcher
//! never enforces the deadline or cancellation itself; invoked methods consult
//! the context and bail out through [`CallContext::ensure_active`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::error::DomainError;

/// Metadata key under which transports record the request identifier.
pub const REQUEST_ID_KEY: &str = "request-id";

/// Shared flag used to cancel an in-flight call.
///
/// Clones observe the same flag, so the transport can keep one half and hand
/// the other to the context.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of every call holding a clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Reason a call context is no longer active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,
    /// The request deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl From<ContextError> for DomainError {
    fn from(error: ContextError) -> Self {
        match error {
            ContextError::Cancelled => Self::new(499, error.to_string()),
            ContextError::DeadlineExceeded => Self::new(504, error.to_string()),
        }
    }
}

/// Cancellation, deadline and request metadata for one call.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancellation: CancellationToken,
    metadata: BTreeMap<String, String>,
}

impl CallContext {
    /// Creates a context with no deadline, no metadata and a fresh token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an absolute deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline relative to now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Replaces the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Attaches a metadata entry, replacing any previous value for the key.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the deadline, if one was set.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the time left before the deadline, saturating at zero.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Returns `true` once the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Returns `true` once the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Returns the cancellation token shared with the transport.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Looks up a metadata value.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Returns the request identifier recorded by the transport, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.metadata(REQUEST_ID_KEY)
    }

    /// Checks that the call may keep running.
    ///
    /// Cancellation takes precedence over an expired deadline.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Cancelled`] when the token has fired and
    /// [`ContextError::DeadlineExceeded`] once the deadline has passed.
    pub fn ensure_active(&self) -> Result<(), ContextError> {
        if self.is_cancelled() {
            return Err(ContextError::Cancelled);
        }
        if self.is_expired() {
            return Err(ContextError::DeadlineExceeded);
        }
        Ok(())
    }
}
