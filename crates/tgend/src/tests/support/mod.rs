//! Shared fixtures and test doubles for the daemon test suites.

mod config_loader;
mod reporter;
mod server;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use server::{TEST_PORT_COUNT, TestServer, emulated_state, test_server};
