//! Error taxonomy for registry construction and request dispatch.
//!
//! [`DomainError`] is what services return for business failures.
//! [`DispatchError`] covers every way a single request can fail between lookup
//! and translation, and knows which transport status and public message it maps
//! to. [`RegistryError`] is only raised while the registry is being built.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::status::Status;

/// Business-level failure reported by an invoked method.
///
/// The code and message are forwarded to the caller unchanged. Services
/// usually define their own error enums and convert them with `From`, which
/// keeps the code mapping local to the service.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct DomainError {
    code: u16,
    message: String,
}

impl DomainError {
    /// Creates a domain error with a code and message.
    #[must_use]
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Creates a domain error from pre-formatted arguments.
    ///
    /// ```
    /// use switchboard::DomainError;
    ///
    /// let error = DomainError::from_args(409, format_args!("user '{}' exists", "admin"));
    /// assert_eq!(error.message(), "user 'admin' exists");
    /// ```
    #[must_use]
    pub fn from_args(code: u16, args: fmt::Arguments<'_>) -> Self {
        Self::new(code, args.to_string())
    }

    /// Numeric code chosen by the service.
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.code
    }

    /// Human-readable message chosen by the service.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Pipeline stage a request was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Looking up the service and method.
    Resolving,
    /// Materialising the method input from the payload.
    Decoding,
    /// Running the method.
    Invoking,
    /// Encoding the method output.
    Translating,
}

impl Stage {
    /// Returns the lowercase stage name used in telemetry.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resolving => "resolving",
            Self::Decoding => "decoding",
            Self::Invoking => "invoking",
            Self::Translating => "translating",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Errors surfaced while dispatching a single request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No service is registered under the requested name.
    #[error("service '{service}' not found")]
    ServiceNotFound {
        /// Requested service name.
        service: String,
    },

    /// The service exposes no invocable method under the requested name.
    #[error("method '{method}' not found on service '{service}'")]
    MethodNotFound {
        /// Service that was searched.
        service: String,
        /// Requested method name.
        method: String,
    },

    /// The payload could not be materialised into the method input type.
    #[error("invalid request body for {input_type}: {source}")]
    Decode {
        /// Rust type the payload was decoded into.
        input_type: &'static str,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The method output could not be serialised.
    #[error("failed to encode {output_type}: {source}")]
    Encode {
        /// Rust type that failed to serialise.
        output_type: &'static str,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The method reported a business failure.
    #[error("domain error {}: {}", .0.code(), .0)]
    Domain(#[from] DomainError),

    /// The method panicked.
    #[error("method '{method}' faulted: {message}")]
    Fault {
        /// Method that panicked.
        method: String,
        /// Panic payload, when it was a string.
        message: String,
    },
}

impl DispatchError {
    /// Creates a service-not-found error.
    pub fn service_not_found(service: impl Into<String>) -> Self {
        Self::ServiceNotFound {
            service: service.into(),
        }
    }

    /// Creates a method-not-found error.
    pub fn method_not_found(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            service: service.into(),
            method: method.into(),
        }
    }

    /// Creates a decode error for the named input type.
    #[must_use]
    pub const fn decode(input_type: &'static str, source: serde_json::Error) -> Self {
        Self::Decode { input_type, source }
    }

    /// Creates an encode error for the named output type.
    #[must_use]
    pub const fn encode(output_type: &'static str, source: serde_json::Error) -> Self {
        Self::Encode {
            output_type,
            source,
        }
    }

    /// Creates a fault error for a method that panicked.
    pub fn fault(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fault {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Returns the transport status for this error.
    ///
    /// Lookup failures are `404`, undecodable payloads `400`, and encoder or
    /// runtime faults `500`. Domain errors derive their status from their own
    /// code.
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::ServiceNotFound { .. } | Self::MethodNotFound { .. } => Status::NOT_FOUND,
            Self::Decode { .. } => Status::BAD_REQUEST,
            Self::Encode { .. } | Self::Fault { .. } => Status::INTERNAL_ERROR,
            Self::Domain(error) => Status::from_domain_code(error.code()),
        }
    }

    /// Returns the message exposed to callers.
    ///
    /// Framework failures use fixed messages so internal detail (type names,
    /// panic payloads) stays in telemetry. Domain messages pass through as-is.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::ServiceNotFound { .. } => "Service not found".to_owned(),
            Self::MethodNotFound { .. } => "Method not found".to_owned(),
            Self::Decode { .. } => "Invalid request body".to_owned(),
            Self::Encode { .. } => "Failed to marshal response".to_owned(),
            Self::Fault { .. } => "Internal server error".to_owned(),
            Self::Domain(error) => error.message().to_owned(),
        }
    }

    /// Returns the pipeline stage that produced this error.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::ServiceNotFound { .. } | Self::MethodNotFound { .. } => Stage::Resolving,
            Self::Decode { .. } => Stage::Decoding,
            Self::Domain(_) | Self::Fault { .. } => Stage::Invoking,
            Self::Encode { .. } => Stage::Translating,
        }
    }
}

/// Errors raised while assembling a [`ServiceRegistry`](crate::ServiceRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A service with the same name is already registered.
    #[error("service '{service}' is already registered")]
    DuplicateService {
        /// Conflicting service name.
        service: String,
    },

    /// A service declared two methods with the same name.
    #[error("method '{method}' is declared twice on service '{service}'")]
    DuplicateMethod {
        /// Service declaring the methods.
        service: String,
        /// Conflicting method name.
        method: String,
    },

    /// A service or method name cannot be addressed by callers.
    #[error("invalid name '{name}': {reason}")]
    InvalidName {
        /// Offending name.
        name: String,
        /// Why the name was rejected.
        reason: &'static str,
    },
}
