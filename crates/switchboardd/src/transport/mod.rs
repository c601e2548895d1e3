//! Socket listener for daemon transport endpoints.
//!
//! The listener binds the configured endpoint, accepts on a dedicated thread
//! and serves every connection on its own worker. Stopping closes the accept
//! loop first and then waits a bounded time for live connections to finish.

mod drain;
mod errors;
mod listener;
mod stream;

pub use self::errors::ListenerError;
pub(crate) use self::listener::{ListenerHandle, SocketListener};
pub(crate) use self::stream::{ConnectionHandler, ConnectionStream};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
