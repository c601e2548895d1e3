//! Translation of invocation outcomes into transport responses.
//!
//! The translator performs no business logic. It turns an encoded output into
//! a success response, and any [`DispatchError`] into a failure response using
//! the error's status and public message.

use crate::codec::CONTENT_TYPE;
use crate::error::DispatchError;
use crate::status::Status;

/// Externally observable outcome of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The method returned a value.
    Success {
        /// Success-class status.
        status: Status,
        /// Encoded output, absent when the output was `null`.
        body: Option<Vec<u8>>,
    },
    /// A stage failed or the method returned an error.
    Failure {
        /// Failure-class status.
        status: Status,
        /// Message safe to show to the caller.
        message: String,
    },
}

impl Response {
    /// Builds a `200` response with an optional body.
    #[must_use]
    pub const fn success(body: Option<Vec<u8>>) -> Self {
        Self::Success {
            status: Status::OK,
            body,
        }
    }

    /// Builds a failure response with the given status and message.
    pub fn failure(status: Status, message: impl Into<String>) -> Self {
        Self::Failure {
            status,
            message: message.into(),
        }
    }

    /// Returns the transport status.
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::Success { status, .. } | Self::Failure { status, .. } => *status,
        }
    }

    /// Returns the encoded body of a success response.
    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        match self {
            Self::Success { body, .. } => body.as_deref(),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the content type of the body, when there is one.
    #[must_use]
    pub fn content_type(&self) -> Option<&'static str> {
        self.body().map(|_| CONTENT_TYPE)
    }

    /// Returns the failure message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { message, .. } => Some(message),
        }
    }

    /// Returns `true` for success responses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Converts a pipeline outcome into exactly one response.
#[must_use]
pub fn translate(outcome: Result<Option<Vec<u8>>, DispatchError>) -> Response {
    match outcome {
        Ok(body) => Response::success(body),
        Err(error) => translate_error(&error),
    }
}

/// Converts a dispatch error into a failure response.
#[must_use]
pub fn translate_error(error: &DispatchError) -> Response {
    Response::failure(error.status(), error.public_message())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;

    #[test]
    fn success_with_body_reports_json() {
        let response = translate(Ok(Some(br#"{"status":"OK"}"#.to_vec())));
        assert!(response.is_success());
        assert_eq!(response.status(), Status::OK);
        assert_eq!(response.body(), Some(br#"{"status":"OK"}"#.as_slice()));
        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(response.message(), None);
    }

    #[test]
    fn success_without_body_has_no_content_type() {
        let response = translate(Ok(None));
        assert_eq!(response.status(), Status::OK);
        assert_eq!(response.body(), None);
        assert_eq!(response.content_type(), None);
    }

    #[test]
    fn domain_errors_keep_code_and_message() {
        let response = translate(Err(DispatchError::from(DomainError::new(
            401,
            "Invalid credentials",
        ))));
        assert_eq!(
            response,
            Response::failure(Status::UNAUTHORIZED, "Invalid credentials")
        );
        assert_eq!(response.body(), None);
    }

    #[test]
    fn stage_failures_use_the_fixed_table() {
        let response = translate(Err(DispatchError::method_not_found("Auth", "Nope")));
        assert_eq!(response, Response::failure(Status::NOT_FOUND, "Method not found"));
    }
}
