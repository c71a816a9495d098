use std::fmt;
use std::io;
use std::thread;
use std::time::Duration;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Why the daemon stopped serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// A termination signal was delivered.
    Signal(i32),
    /// A client issued a successful `shutdown` command.
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(signal) => write!(formatter, "signal {signal}"),
            Self::Requested => formatter.write_str("client request"),
        }
    }
}

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until a termination signal arrives or `requested` returns
    /// `true`.
    fn wait(&self, requested: &dyn Fn() -> bool) -> Result<ShutdownReason, ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Shutdown listener that waits for termination signals.
#[derive(Debug, Clone)]
pub struct SystemShutdownSignal {
    poll_interval: Duration,
}

impl SystemShutdownSignal {
    /// Builds a listener that checks for client requests every
    /// `poll_interval`.
    #[must_use]
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self, requested: &dyn Fn() -> bool) -> Result<ShutdownReason, ShutdownError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        loop {
            if let Some(signal) = signals.pending().next() {
                info!(target: PROCESS_TARGET, signal, "shutdown signal received");
                return Ok(ShutdownReason::Signal(signal));
            }
            if requested() {
                info!(target: PROCESS_TARGET, "shutdown requested by client");
                return Ok(ShutdownReason::Requested);
            }
            thread::sleep(self.poll_interval);
        }
    }
}
