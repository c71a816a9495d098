//! Daemon bootstrap orchestration.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use tgen_config::{Config, ConfigValidationError, SocketPreparationError};

use crate::api_version::ApiVersionTable;
use crate::commands::build_registry;
use crate::health::HealthReporter;
use crate::host::HostInfo;
use crate::platform::{EmulatedPlatform, PlatformApi};
use crate::rpc::{Dispatcher, RegistryError};
use crate::state::ServerState;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
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

/// Loader that hands out a configuration resolved elsewhere.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
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
    /// The loaded configuration is inconsistent.
    #[error("invalid configuration: {source}")]
    Validation {
        /// Violated rule.
        #[source]
        source: ConfigValidationError,
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
    /// The command table could not be built.
    #[error("failed to build command registry: {source}")]
    Registry {
        /// Registration conflict.
        #[source]
        source: RegistryError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    dispatcher: Arc<Dispatcher>,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Dispatcher serving every registered command.
    #[must_use]
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Reporter receiving lifecycle events.
    #[must_use]
    pub fn reporter(&self) -> &Arc<dyn HealthReporter> {
        &self.reporter
    }

    /// Whether a client asked the platform to shut down.
    #[must_use]
    pub fn shutdown_requested(&self) -> bool {
        self.dispatcher.state().platform().is_marked_for_shutdown()
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Daemon")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

/// Builds the in-memory platform described by `config`.
#[must_use]
pub fn emulated_platform(config: &Config) -> Arc<dyn PlatformApi> {
    Arc::new(EmulatedPlatform::new(
        config.port_count(),
        config.dp_core_count(),
    ))
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// `platform` is called once, after the configuration has been validated.
pub fn bootstrap_with<F>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    platform: F,
) -> Result<Daemon, BootstrapError>
where
    F: FnOnce(&Config) -> Arc<dyn PlatformApi>,
{
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => return Err(fail(&reporter, BootstrapError::Configuration { source })),
    };

    if let Err(source) = config.validate() {
        return Err(fail(&reporter, BootstrapError::Validation { source }));
    }

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => return Err(fail(&reporter, BootstrapError::Telemetry { source })),
    };

    if let Err(source) = config.daemon_socket().prepare_filesystem() {
        return Err(fail(&reporter, BootstrapError::Socket { source }));
    }

    let registry = match build_registry() {
        Ok(registry) => registry,
        Err(source) => return Err(fail(&reporter, BootstrapError::Registry { source })),
    };

    let state = ServerState::new(
        platform(&config),
        ApiVersionTable::new(),
        HostInfo::detect(),
        config.dp_core_count(),
    );
    let dispatcher = Arc::new(Dispatcher::new(registry, Arc::new(state)));
    reporter.bootstrap_succeeded(&config);

    Ok(Daemon {
        config,
        dispatcher,
        telemetry,
        reporter,
    })
}

fn fail(reporter: &Arc<dyn HealthReporter>, error: BootstrapError) -> BootstrapError {
    reporter.bootstrap_failed(&error);
    error
}
