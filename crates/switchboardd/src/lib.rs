//! The switchboard daemon.
//!
//! `switchboardd` exposes the services in its registry over a socket
//! configured via [`switchboard_config`]. Each connection carries one JSONL
//! request naming a route such as `/HPC/AuthService/Login` and a JSON body.
//! The daemon resolves the route, hands the body to the
//! [`switchboard::Dispatcher`], and writes back exactly one JSONL response.
//!
//! Startup follows a fixed sequence: load configuration, install telemetry,
//! prepare the socket directory, build the service registry, bind the
//! listener, then block until a termination signal arrives. Each step reports
//! through a [`HealthReporter`] so operators can see where a failed start
//! stopped.

mod bootstrap;
mod dispatch;
mod health;
mod process;
pub mod services;
pub mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use dispatch::{DispatchSettings, RequestError, ResponseError, RouteError};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon};
pub use services::{DefaultServices, ServiceProvider};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ListenerError;

#[cfg(test)]
mod tests;
