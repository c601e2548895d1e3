//! Supervises daemon launch sequencing and runtime orchestration.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::StructuredHealthReporter;
use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::dispatch::{DispatchConnectionHandler, DispatchSettings};
use crate::health::HealthReporter;
use crate::services::{DefaultServices, ServiceProvider};
use crate::transport::SocketListener;

use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use super::{DRAIN_TIMEOUT, PROCESS_TARGET};

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, S, P> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) services: P,
    pub(crate) shutdown: S,
}

/// Runs the daemon using the production collaborators.
///
/// Signal handlers are installed before anything else. The call blocks until
/// a termination signal arrives, then stops accepting connections and gives
/// in-flight calls a bounded time to finish.
///
/// # Errors
///
/// Returns a [`LaunchError`] when installing the signal handlers, bootstrap
/// or binding the listener fails, or when connections are still open once
/// the drain period ends.
pub fn run_daemon() -> Result<(), LaunchError> {
    let plan = LaunchPlan {
        shutdown: SystemShutdownSignal::install()?,
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        services: DefaultServices,
    };
    run_daemon_with(plan)
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, S, P>(plan: LaunchPlan<L, S, P>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
    P: ServiceProvider,
{
    let LaunchPlan {
        loader,
        reporter,
        services,
        shutdown,
    } = plan;

    info!(target: PROCESS_TARGET, "starting daemon runtime");
    let daemon = bootstrap_with(&loader, Arc::clone(&reporter), &services)?;
    let (config, dispatcher) = daemon.into_parts();

    let listener = SocketListener::bind(config.listen_socket())?;
    debug!(target: PROCESS_TARGET, endpoint = %listener.endpoint(), "listener bound");
    let handler = Arc::new(DispatchConnectionHandler::new(
        dispatcher,
        DispatchSettings::from_config(&config),
    ));
    let listener = listener.start(handler)?;
    reporter.listener_ready(listener.endpoint());

    let waited = shutdown.wait();
    if waited.is_ok() {
        reporter.shutdown_started();
    }
    let stopped = listener.stop(DRAIN_TIMEOUT);
    if let Err(error) = waited {
        if let Err(stop_error) = stopped {
            warn!(target: PROCESS_TARGET, error = %stop_error, "listener did not stop cleanly");
        }
        return Err(error.into());
    }
    stopped?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}
