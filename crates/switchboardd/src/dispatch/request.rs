//! Request envelope parsing.

use serde::{Deserialize, Deserializer};
use serde_json::value::RawValue;

use super::errors::RequestError;

/// One inbound request line.
///
/// The body is kept as raw JSON so the dispatcher decodes it exactly once,
/// into the input type of the resolved method.
#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    /// Route such as `/HPC/AuthService/Login`.
    pub path: String,
    /// Method payload. Absent bodies are forwarded as an empty payload.
    #[serde(default, deserialize_with = "present")]
    pub body: Option<Box<RawValue>>,
    /// Caller-supplied identifier echoed into logs.
    #[serde(default)]
    pub request_id: Option<String>,
}

impl InvokeRequest {
    /// Parses a JSONL line into a request.
    ///
    /// Trailing whitespace, including the newline delimiter, is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Malformed`] when the line is empty or is not a
    /// request envelope.
    pub fn parse(line: &[u8]) -> Result<Self, RequestError> {
        let trimmed = line.trim_ascii_end();
        if trimmed.is_empty() {
            return Err(RequestError::malformed("empty request line"));
        }
        serde_json::from_slice(trimmed).map_err(RequestError::from_json_error)
    }

    /// Payload bytes handed to the dispatcher.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        self.body
            .as_deref()
            .map_or(&[][..], |raw| raw.get().as_bytes())
    }
}

/// Keeps an explicit `null` body as a payload instead of treating it as absent.
fn present<'de, D>(deserializer: D) -> Result<Option<Box<RawValue>>, D::Error>
where
    D: Deserializer<'de>,
{
    Box::<RawValue>::deserialize(deserializer).map(Some)
}
