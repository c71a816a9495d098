//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use tgen_config::{Config, SocketEndpoint};

use crate::bootstrap::ConfigLoader;

/// Loader serving a loopback TCP endpoint on a kernel-assigned port.
#[derive(Debug, Clone)]
pub struct TestConfigLoader {
    config: Config,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Config {
                daemon_socket: SocketEndpoint::tcp("127.0.0.1", 0),
                ..Config::default()
            },
        }
    }

    /// Overrides the number of emulated ports.
    #[must_use]
    pub fn with_port_count(mut self, port_count: u8) -> Self {
        self.config.port_count = port_count;
        self
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Loader that intentionally fails by passing invalid CLI arguments.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("tgend"),
            OsString::from("--daemon-socket"),
            OsString::from("invalid://socket"),
        ];
        Config::load_from_iter(args)
    }
}
