//! Error types for request framing and response delivery.

use std::io;

use switchboard::Status;
use thiserror::Error;

use super::route::RouteError;

/// Errors raised before a request reaches the dispatcher.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request line was empty or not a valid request envelope.
    #[error("malformed request: {message}")]
    Malformed {
        /// Description of the problem.
        message: String,
        /// Parser error, when one was raised.
        #[source]
        source: Option<serde_json::Error>,
    },
    /// The request line exceeded the configured limit.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    TooLarge {
        /// Bytes read before giving up.
        size: usize,
        /// Configured limit.
        max_size: usize,
    },
    /// The path did not name a service method.
    #[error(transparent)]
    Route(#[from] RouteError),
    /// Reading from the connection failed.
    #[error("failed to read request: {0}")]
    Io(#[from] io::Error),
}

impl RequestError {
    /// Creates a malformed request error from a parser failure.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::Malformed {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed request error with a custom message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a request too large error.
    pub const fn too_large(size: usize, max_size: usize) -> Self {
        Self::TooLarge { size, max_size }
    }

    /// Transport status reported to the client.
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::Malformed { .. } | Self::TooLarge { .. } | Self::Io(_) => Status::BAD_REQUEST,
            Self::Route(_) => Status::NOT_FOUND,
        }
    }

    /// Message reported to the client.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::Malformed { .. } | Self::Io(_) => "Malformed request",
            Self::TooLarge { .. } => "Request too large",
            Self::Route(_) => "Route not found",
        }
    }
}

/// Errors raised while writing a response line.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The response could not be serialised.
    #[error("failed to serialise response: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Writing to the connection failed.
    #[error("failed to write response: {0}")]
    Io(#[from] io::Error),
}
