//! Daemon bootstrap orchestration.

use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;
use tracing::debug;

use switchboard::{Dispatcher, RegistryError, ServiceRegistry};
use switchboard_config::{Config, SocketPreparationError};

use crate::health::HealthReporter;
use crate::services::ServiceProvider;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader error when any configuration layer is invalid.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out an already resolved configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps a configuration value.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare daemon socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
    /// A service could not be registered.
    #[error("failed to build service registry: {source}")]
    Registry {
        /// Registration failure.
        #[source]
        source: RegistryError,
    },
}

/// Result of a successful bootstrap invocation.
#[derive(Debug)]
pub struct Daemon {
    config: Config,
    dispatcher: Dispatcher,
    telemetry: TelemetryHandle,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Dispatcher bound to the frozen service registry.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Registry the daemon serves.
    #[must_use]
    pub fn registry(&self) -> &ServiceRegistry {
        self.dispatcher.registry()
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Splits the daemon into its configuration and dispatcher.
    #[must_use]
    pub fn into_parts(self) -> (Config, Dispatcher) {
        (self.config, self.dispatcher)
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// Every failure is reported through `reporter` before it is returned.
///
/// # Errors
///
/// Returns a [`BootstrapError`] naming the step that failed.
pub fn bootstrap_with<P>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    services: &P,
) -> Result<Daemon, BootstrapError>
where
    P: ServiceProvider + ?Sized,
{
    reporter.bootstrap_starting();
    let result = bootstrap_steps(loader, services);
    match &result {
        Ok(daemon) => reporter.bootstrap_succeeded(daemon.config(), daemon.registry()),
        Err(error) => reporter.bootstrap_failed(error),
    }
    result
}

fn bootstrap_steps<P>(loader: &dyn ConfigLoader, services: &P) -> Result<Daemon, BootstrapError>
where
    P: ServiceProvider + ?Sized,
{
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    config
        .listen_socket()
        .prepare_filesystem()
        .map_err(|source| BootstrapError::Socket { source })?;
    let registry = services
        .registry()
        .map_err(|source| BootstrapError::Registry { source })?;

    for name in registry.service_names() {
        let methods = registry
            .get(name)
            .map(|handle| handle.method_names())
            .unwrap_or_default();
        debug!(
            target: BOOTSTRAP_TARGET,
            service = name,
            methods = ?methods,
            "service registered"
        );
    }

    Ok(Daemon {
        config,
        dispatcher: Dispatcher::new(Arc::new(registry)),
        telemetry,
    })
}
