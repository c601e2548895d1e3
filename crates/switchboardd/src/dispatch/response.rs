//! Response framing for the dispatch loop.

use std::io::Write;

use serde::Serialize;
use serde_json::value::RawValue;
use switchboard::{Response, ResponseSink, Status};

use super::errors::{RequestError, ResponseError};

/// Wire form of one response line.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WireResponse<'a> {
    /// The method returned a value.
    Success {
        /// Success-class status.
        status: Status,
        /// Present only alongside a body.
        #[serde(skip_serializing_if = "Option::is_none")]
        content_type: Option<&'static str>,
        /// Encoded output, embedded as JSON.
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<&'a RawValue>,
    },
    /// The request failed.
    Failure {
        /// Failure-class status.
        status: Status,
        /// Message safe to show to the caller.
        message: &'a str,
    },
}

impl<'a> WireResponse<'a> {
    /// Borrows a dispatcher response in wire form.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::Serialize`] when the body is not valid JSON.
    pub fn from_response(response: &'a Response) -> Result<Self, ResponseError> {
        match response {
            Response::Success { status, body } => Ok(Self::Success {
                status: *status,
                content_type: response.content_type(),
                body: body
                    .as_deref()
                    .map(|bytes| serde_json::from_slice::<&RawValue>(bytes))
                    .transpose()?,
            }),
            Response::Failure { status, message } => Ok(Self::Failure {
                status: *status,
                message,
            }),
        }
    }
}

/// Writer that frames responses as JSONL.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Creates a response writer wrapping the given output stream.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one response line and flushes the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub fn write_response(&mut self, response: &Response) -> Result<(), ResponseError> {
        self.write_wire(&WireResponse::from_response(response)?)
    }

    /// Writes the failure line for a request that never reached the dispatcher.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_request_error(&mut self, error: &RequestError) -> Result<(), ResponseError> {
        self.write_wire(&WireResponse::Failure {
            status: error.status(),
            message: error.public_message(),
        })
    }

    fn write_wire(&mut self, message: &WireResponse<'_>) -> Result<(), ResponseError> {
        serde_json::to_writer(&mut self.writer, message)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> ResponseSink for ResponseWriter<W> {
    type Error = ResponseError;

    fn send(&mut self, response: &Response) -> Result<(), Self::Error> {
        self.write_response(response)
    }
}
