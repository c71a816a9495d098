//! Shared configuration for the traffic generator control-plane daemon.
//!
//! Configuration is layered with [`ortho_config`]: built-in defaults are
//! overridden by a configuration file, then by `TGEN_*` environment variables,
//! and finally by command-line flags. The resolved [`Config`] describes where
//! the daemon listens, how it logs, and the shape of the emulated platform it
//! exposes to clients.

mod defaults;
mod logging;
mod socket;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_DP_CORE_COUNT, DEFAULT_LOG_FILTER, DEFAULT_PORT_COUNT, DEFAULT_TCP_PORT,
    default_dp_core_count, default_log_filter, default_log_filter_string, default_log_format,
    default_port_count, default_socket_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "TGEN")]
pub struct Config {
    /// Endpoint the daemon listens on.
    #[ortho_config(default = default_socket_endpoint())]
    pub daemon_socket: SocketEndpoint,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log records.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Number of ports exposed by the emulated platform.
    #[ortho_config(default = DEFAULT_PORT_COUNT)]
    pub port_count: u8,
    /// Number of data-plane cores reported to clients.
    #[ortho_config(default = DEFAULT_DP_CORE_COUNT)]
    pub dp_core_count: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_socket: default_socket_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            port_count: default_port_count(),
            dp_core_count: default_dp_core_count(),
        }
    }
}

impl Config {
    /// Endpoint the daemon listens on.
    #[must_use]
    pub fn daemon_socket(&self) -> &SocketEndpoint {
        &self.daemon_socket
    }

    /// Filter expression handed to the tracing subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format for log records.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Number of emulated ports.
    #[must_use]
    pub fn port_count(&self) -> u8 {
        self.port_count
    }

    /// Number of data-plane cores.
    #[must_use]
    pub fn dp_core_count(&self) -> u8 {
        self.dp_core_count
    }

    /// Checks cross-field invariants the loader cannot express.
    ///
    /// Ports are paired into dual-port interfaces, so the count must be even
    /// and non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigValidationError`] describing the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.port_count == 0 || self.port_count & 1 != 0 {
            return Err(ConfigValidationError::PortCount {
                count: self.port_count,
            });
        }
        if self.dp_core_count == 0 {
            return Err(ConfigValidationError::DpCoreCount);
        }
        Ok(())
    }
}

/// Errors raised when a loaded configuration is internally inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    /// The port count is zero or odd.
    #[error("port_count must be a non-zero even number, got {count}")]
    PortCount {
        /// Offending port count.
        count: u8,
    },
    /// No data-plane cores were configured.
    #[error("dp_core_count must be at least 1")]
    DpCoreCount,
}

impl ConfigValidationError {
    /// Configuration key the error refers to.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::PortCount { .. } => "port_count",
            Self::DpCoreCount => "dp_core_count",
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port_count(), DEFAULT_PORT_COUNT);
        assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
    }

    #[rstest]
    #[case(0)]
    #[case(3)]
    #[case(7)]
    fn rejects_odd_or_zero_port_count(#[case] count: u8) {
        let config = Config {
            port_count: count,
            ..Config::default()
        };
        let error = config.validate().expect_err("port count must be rejected");
        assert_eq!(error, ConfigValidationError::PortCount { count });
        assert_eq!(error.key(), "port_count");
    }

    #[test]
    fn rejects_zero_core_count() {
        let config = Config {
            dp_core_count: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigValidationError::DpCoreCount));
    }
}
