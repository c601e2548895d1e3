//! JSONL request handling for daemon connections.
//!
//! Each connection carries a single request line naming a route and a body:
//!
//! ```json
//! {"path":"/HPC/AuthService/Login","body":{"username":"admin","password":"password"}}
//! ```
//!
//! The daemon answers with exactly one line, either a success carrying the
//! encoded output or a failure carrying a status and message:
//!
//! ```json
//! {"kind":"success","status":200,"content_type":"application/json","body":{"message":"Login successful","status":"OK"}}
//! {"kind":"failure","status":401,"message":"Invalid credentials"}
//! ```
//!
//! Framing and route problems are answered here. Everything past the route is
//! delegated to [`switchboard::Dispatcher`].

mod errors;
mod handler;
mod request;
mod response;
mod route;

pub use self::errors::{RequestError, ResponseError};
pub(crate) use self::handler::DispatchConnectionHandler;
pub use self::handler::DispatchSettings;
pub use self::route::RouteError;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
