//! Orchestrates the daemon lifetime: bootstrap, serve, stop.

use std::sync::Arc;

use tracing::info;

use tgen_config::Config;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with, emulated_platform};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::platform::PlatformApi;
use crate::rpc::RpcConnectionHandler;
use crate::transport::SocketListener;

use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use super::{LaunchError, PROCESS_TARGET, SHUTDOWN_POLL_INTERVAL};

/// Runs the daemon in the foreground using the production collaborators.
pub fn run_daemon() -> Result<(), LaunchError> {
    let reporter = Arc::new(StructuredHealthReporter::new());
    let shutdown = SystemShutdownSignal::new(SHUTDOWN_POLL_INTERVAL);
    run_daemon_with(&SystemConfigLoader, reporter, emulated_platform, &shutdown)
}

/// Runs the daemon with injected collaborators.
///
/// Returns once `shutdown` reports a termination signal or a client has
/// marked the platform for shutdown; the listener is stopped and joined
/// before returning.
pub(crate) fn run_daemon_with<F>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    platform: F,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), LaunchError>
where
    F: FnOnce(&Config) -> Arc<dyn PlatformApi>,
{
    info!(target: PROCESS_TARGET, "starting daemon runtime");
    let daemon = bootstrap_with(loader, Arc::clone(&reporter), platform)?;

    let listener = SocketListener::bind(daemon.config().daemon_socket())?;
    reporter.listener_ready(listener.endpoint());
    let handle = listener.start(Arc::new(RpcConnectionHandler::new(daemon.dispatcher())))?;

    let reason = shutdown.wait(&|| daemon.shutdown_requested())?;
    reporter.shutdown_requested(reason);

    handle.shutdown();
    handle.join()?;
    info!(
        target: PROCESS_TARGET,
        %reason,
        "shutdown sequence completed"
    );
    Ok(())
}
