//! Statically typed service-method dispatch.
//!
//! `switchboard` routes a `(service, method, payload)` triple to a method on a
//! registered service, decodes the JSON payload into the method's declared
//! input type, invokes it, and translates the outcome into a transport status
//! with either an encoded body or a message.
//!
//! # Architecture
//!
//! Every request flows through the same linear pipeline:
//!
//! 1. **Resolve**: [`ServiceRegistry::lookup`] finds the service by exact name
//!    and [`ServiceHandle::resolve`] finds the method.
//! 2. **Decode**: the payload is decoded into the input type the method was
//!    registered with.
//! 3. **Invoke**: the method runs once with a borrowed [`CallContext`]. Panics
//!    become faults for that request only.
//! 4. **Translate**: the output is encoded, or the error is mapped to a
//!    [`Status`] and public message.
//!
//! The first failing stage ends the pipeline. Method tables are built at
//! registration time from ordinary Rust functions, so nothing is inspected at
//! call time and only methods with the calling convention
//! `Fn(&S, &CallContext, Input) -> Result<Output, Error>` can be registered.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use serde::{Deserialize, Serialize};
//! use switchboard::{
//!     CallContext, Dispatcher, DomainError, MethodTable, Service, ServiceRegistry, Status,
//! };
//!
//! #[derive(Deserialize)]
//! struct Ping {
//!     seq: u32,
//! }
//!
//! #[derive(Serialize)]
//! struct Pong {
//!     seq: u32,
//! }
//!
//! struct Echo;
//!
//! impl Echo {
//!     fn ping(&self, _ctx: &CallContext, ping: Ping) -> Result<Pong, DomainError> {
//!         Ok(Pong { seq: ping.seq })
//!     }
//! }
//!
//! impl Service for Echo {
//!     const NAME: &'static str = "Echo";
//!
//!     fn methods(table: &mut MethodTable<Self>) {
//!         table.method("Ping", Self::ping);
//!     }
//! }
//!
//! let registry = ServiceRegistry::builder()
//!     .register(Echo)
//!     .expect("register echo")
//!     .build();
//! let dispatcher = Dispatcher::new(Arc::new(registry));
//!
//! let response = dispatcher.dispatch(&CallContext::new(), "Echo", "Ping", br#"{"seq":7}"#);
//! assert_eq!(response.status(), Status::OK);
//! assert_eq!(response.body(), Some(br#"{"seq":7}"#.as_slice()));
//!
//! let missing = dispatcher.dispatch(&CallContext::new(), "Echo", "Pong", b"{}");
//! assert_eq!(missing.status(), Status::NOT_FOUND);
//! ```

pub mod codec;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod invoker;
pub mod method;
pub mod registry;
pub mod status;
pub mod translator;

#[cfg(test)]
mod tests;

pub use self::context::{CallContext, CancellationToken, ContextError};
pub use self::dispatcher::{Dispatcher, ResponseSink};
pub use self::error::{DispatchError, DomainError, RegistryError, Stage};
pub use self::method::{MethodDescriptor, MethodTable, Service};
pub use self::registry::{RegistryBuilder, ServiceHandle, ServiceRegistry};
pub use self::status::Status;
pub use self::translator::Response;
