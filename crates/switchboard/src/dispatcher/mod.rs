//! Request dispatch pipeline.
//!
//! [`Dispatcher::dispatch`] drives one request through a strictly linear
//! pipeline: resolve the service and method, decode the payload, invoke the
//! method, then translate the outcome. The first failing stage short-circuits
//! the rest and becomes the single response for the request.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::context::CallContext;
use crate::error::DispatchError;
use crate::registry::ServiceRegistry;
use crate::translator::{self, Response};

/// Tracing target for dispatch operations.
const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Destination for the single response produced by a dispatch.
///
/// Transports implement this to write the response in their own framing.
pub trait ResponseSink {
    /// Error raised when the response cannot be delivered.
    type Error;

    /// Delivers the response.
    ///
    /// # Errors
    ///
    /// Returns the transport error when delivery fails.
    fn send(&mut self, response: &Response) -> Result<(), Self::Error>;
}

impl ResponseSink for Vec<Response> {
    type Error = std::convert::Infallible;

    fn send(&mut self, response: &Response) -> Result<(), Self::Error> {
        self.push(response.clone());
        Ok(())
    }
}

/// Routes `(service, method, payload)` triples to registered methods.
///
/// The dispatcher holds the only shared state, a read-only registry, so it
/// can be cloned into every connection handler.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ServiceRegistry>,
}

impl Dispatcher {
    /// Creates a dispatcher over a frozen registry.
    #[must_use]
    pub const fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the registry requests are routed against.
    #[must_use]
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Dispatches one request and returns its response.
    pub fn dispatch(
        &self,
        context: &CallContext,
        service: &str,
        method: &str,
        payload: &[u8],
    ) -> Response {
        debug!(
            target: DISPATCH_TARGET,
            service,
            method,
            payload_bytes = payload.len(),
            request_id = context.request_id(),
            "dispatching request"
        );

        let outcome = self.run(context, service, method, payload);
        if let Err(error) = &outcome {
            warn!(
                target: DISPATCH_TARGET,
                service,
                method,
                stage = %error.stage(),
                status = %error.status(),
                %error,
                "dispatch failed"
            );
        }
        translator::translate(outcome)
    }

    /// Dispatches one request and hands the response to `sink`.
    ///
    /// # Errors
    ///
    /// Returns the sink's error when the response cannot be delivered. The
    /// request itself has already run by then.
    pub fn dispatch_to<K: ResponseSink>(
        &self,
        context: &CallContext,
        service: &str,
        method: &str,
        payload: &[u8],
        sink: &mut K,
    ) -> Result<(), K::Error> {
        let response = self.dispatch(context, service, method, payload);
        sink.send(&response)
    }

    fn run(
        &self,
        context: &CallContext,
        service: &str,
        method: &str,
        payload: &[u8],
    ) -> Result<Option<Vec<u8>>, DispatchError> {
        let descriptor = self.registry.lookup(service)?.resolve(method)?;
        debug!(
            target: DISPATCH_TARGET,
            service,
            method,
            input_type = descriptor.input_type(),
            output_type = descriptor.output_type(),
            "method resolved"
        );
        descriptor.call(context, payload)
    }
}
