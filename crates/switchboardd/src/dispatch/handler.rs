//! Connection handler that dispatches JSONL requests.
//!
//! Each connection is handled synchronously: the handler reads one request
//! line, resolves its route, dispatches it and writes the single response line
//! before closing the connection.

use std::io::{self, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use switchboard::context::REQUEST_ID_KEY;
use switchboard::{CallContext, Dispatcher};
use switchboard_config::{
    Config, DEFAULT_CALL_TIMEOUT_MS, DEFAULT_MAX_REQUEST_BYTES, DEFAULT_ROUTE_PREFIX,
};
use tracing::{debug, warn};

use crate::transport::{ConnectionHandler, ConnectionStream};

use super::DISPATCH_TARGET;
use super::errors::RequestError;
use super::request::InvokeRequest;
use super::response::ResponseWriter;
use super::route::Route;

/// Per-connection limits and routing parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    route_prefix: String,
    max_request_bytes: usize,
    call_timeout: Option<Duration>,
}

impl DispatchSettings {
    /// Derives settings from the daemon configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            route_prefix: config.route_prefix().to_owned(),
            max_request_bytes: config.max_request_bytes(),
            call_timeout: config.call_timeout(),
        }
    }

    /// Replaces the route prefix.
    #[must_use]
    pub fn with_route_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.route_prefix = prefix.into();
        self
    }

    /// Replaces the request size limit.
    #[must_use]
    pub const fn with_max_request_bytes(mut self, limit: usize) -> Self {
        self.max_request_bytes = limit;
        self
    }

    /// Replaces the per-call deadline. `None` disables it.
    #[must_use]
    pub const fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Required first path segment.
    #[must_use]
    pub fn route_prefix(&self) -> &str {
        &self.route_prefix
    }

    /// Largest accepted request line in bytes.
    #[must_use]
    pub const fn max_request_bytes(&self) -> usize {
        self.max_request_bytes
    }

    /// Deadline applied to each call.
    #[must_use]
    pub const fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            route_prefix: DEFAULT_ROUTE_PREFIX.to_owned(),
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            call_timeout: Some(Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS)),
        }
    }
}

/// Connection handler that parses and dispatches JSONL requests.
#[derive(Debug)]
pub(crate) struct DispatchConnectionHandler {
    dispatcher: Dispatcher,
    settings: DispatchSettings,
    next_request: AtomicU64,
}

impl DispatchConnectionHandler {
    /// Creates a handler routing requests to `dispatcher`.
    pub(crate) const fn new(dispatcher: Dispatcher, settings: DispatchSettings) -> Self {
        Self {
            dispatcher,
            settings,
            next_request: AtomicU64::new(1),
        }
    }

    fn dispatch(&self, mut stream: ConnectionStream) {
        let peer = stream.peer().to_owned();
        let line = match read_request_line(&mut stream, self.settings.max_request_bytes) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(target: DISPATCH_TARGET, %peer, "client disconnected without request");
                return;
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %peer, %error, "failed to read request");
                reject(&mut ResponseWriter::new(&mut stream), &error);
                return;
            }
        };

        let mut writer = ResponseWriter::new(&mut stream);
        let (request, route) = match self.parse(&line) {
            Ok(parsed) => parsed,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %peer, %error, "rejected request");
                reject(&mut writer, &error);
                return;
            }
        };

        let context = self.context_for(&request);
        if let Err(error) = self.dispatcher.dispatch_to(
            &context,
            route.service(),
            route.method(),
            request.payload(),
            &mut writer,
        ) {
            warn!(
                target: DISPATCH_TARGET,
                %peer,
                %error,
                request_id = context.request_id(),
                "failed to write response"
            );
        }
    }

    fn parse(&self, line: &[u8]) -> Result<(InvokeRequest, Route), RequestError> {
        let request = InvokeRequest::parse(line)?;
        let route = Route::parse(&request.path, &self.settings.route_prefix)?;
        Ok((request, route))
    }

    fn context_for(&self, request: &InvokeRequest) -> CallContext {
        let request_id = request.request_id.clone().unwrap_or_else(|| {
            let sequence = self.next_request.fetch_add(1, Ordering::Relaxed);
            format!("req-{sequence}")
        });
        let context = CallContext::new().with_metadata(REQUEST_ID_KEY, request_id);
        match self.settings.call_timeout {
            Some(timeout) => context.with_timeout(timeout),
            None => context,
        }
    }
}

impl ConnectionHandler for DispatchConnectionHandler {
    fn serve(&self, connection: ConnectionStream) {
        self.dispatch(connection);
    }
}

/// Writes the failure line for a request rejected before dispatch.
fn reject<W: io::Write>(writer: &mut ResponseWriter<W>, error: &RequestError) {
    if let Err(write_error) = writer.write_request_error(error) {
        warn!(
            target: DISPATCH_TARGET,
            error = %write_error,
            status = %error.status(),
            "failed to write rejection"
        );
    }
}

/// Reads a bounded JSONL request line from the stream.
///
/// Returns `Ok(None)` if the client disconnects without sending data, and the
/// partial line if the client closes its write half without a newline.
fn read_request_line<R: Read>(
    stream: &mut R,
    max_bytes: usize,
) -> Result<Option<Vec<u8>>, RequestError> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];

    loop {
        let bytes_read = read_with_retry(stream, &mut chunk)?;

        if bytes_read == 0 {
            return Ok(if buffer.is_empty() {
                None
            } else {
                Some(buffer)
            });
        }

        if let Some(newline_pos) = chunk[..bytes_read].iter().position(|b| *b == b'\n') {
            buffer.extend_from_slice(&chunk[..=newline_pos]);
            enforce_limit(buffer.len(), max_bytes)?;
            return Ok(Some(buffer));
        }

        buffer.extend_from_slice(&chunk[..bytes_read]);
        enforce_limit(buffer.len(), max_bytes)?;
    }
}

fn read_with_retry<R: Read>(stream: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

fn enforce_limit(size: usize, max_bytes: usize) -> Result<(), RequestError> {
    if size > max_bytes {
        return Err(RequestError::too_large(size, max_bytes));
    }
    Ok(())
}
