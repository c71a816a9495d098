//! In-process server over the emulated platform for command tests.

use std::sync::Arc;

use rstest::fixture;
use serde_json::{Value, json};
use time::macros::datetime;

use crate::api_version::{ApiClass, ApiVersion, ApiVersionTable};
use crate::commands::build_registry;
use crate::host::HostInfo;
use crate::platform::{EmulatedPlatform, PlatformApi};
use crate::ports::PortState;
use crate::rpc::{Dispatcher, Outcome};
use crate::state::ServerState;

/// Ports exposed by test servers.
pub const TEST_PORT_COUNT: u8 = 4;
/// Data-plane cores reported by test servers.
pub const TEST_DP_CORE_COUNT: u8 = 2;

fn test_host() -> HostInfo {
    HostInfo::new(
        "trafficgen",
        "Test CPU @ 3.00GHz",
        datetime!(2026-01-02 03:04:05 UTC),
    )
}

fn state_over(platform: Arc<dyn PlatformApi>) -> Arc<ServerState> {
    Arc::new(ServerState::new(
        platform,
        ApiVersionTable::new(),
        test_host(),
        TEST_DP_CORE_COUNT,
    ))
}

/// Server state over a fresh emulated platform.
#[must_use]
pub fn emulated_state() -> Arc<ServerState> {
    state_over(Arc::new(EmulatedPlatform::new(
        TEST_PORT_COUNT,
        TEST_DP_CORE_COUNT,
    )))
}

/// Dispatcher plus direct access to the platform behind it.
pub struct TestServer {
    emulated: Option<Arc<EmulatedPlatform>>,
    dispatcher: Dispatcher,
}

impl TestServer {
    /// Server over a fresh emulated platform.
    #[must_use]
    pub fn new() -> Self {
        let platform = Arc::new(EmulatedPlatform::new(TEST_PORT_COUNT, TEST_DP_CORE_COUNT));
        let shared: Arc<dyn PlatformApi> = platform.clone();
        Self {
            emulated: Some(platform),
            dispatcher: Dispatcher::new(build_registry().expect("registry"), state_over(shared)),
        }
    }

    /// Server over an arbitrary platform, typically a mock.
    #[must_use]
    pub fn with_platform(platform: Arc<dyn PlatformApi>) -> Self {
        Self {
            emulated: None,
            dispatcher: Dispatcher::new(build_registry().expect("registry"), state_over(platform)),
        }
    }

    /// Runs a command.
    pub fn execute(&self, command: &str, params: Value) -> Outcome {
        self.dispatcher.execute(command, &params)
    }

    /// The emulated platform.
    pub fn platform(&self) -> &EmulatedPlatform {
        self.emulated
            .as_deref()
            .expect("server was built over a custom platform")
    }

    /// Shared server state.
    pub fn state(&self) -> &ServerState {
        self.dispatcher.state()
    }

    /// Core API handler, as `sync` would issue it.
    pub fn api_handler(&self) -> String {
        let ApiVersion { major, minor } = ApiVersion::CORE;
        self.state()
            .api()
            .verify(ApiClass::Core, major, minor)
            .expect("core API")
            .to_owned()
    }

    /// Acquires `port_id` for `user` through the command layer.
    pub fn acquire(&self, port_id: u8, user: &str) -> String {
        self.acquire_with(port_id, user, false)
    }

    /// Takes `port_id` over for `user` regardless of its owner.
    pub fn force_acquire(&self, port_id: u8, user: &str) -> String {
        self.acquire_with(port_id, user, true)
    }

    fn acquire_with(&self, port_id: u8, user: &str, force: bool) -> String {
        let outcome = self.execute(
            "acquire",
            json!({
                "api_h": self.api_handler(),
                "port_id": port_id,
                "user": user,
                "session_id": 1,
                "force": force,
            }),
        );
        assert!(outcome.is_ok(), "acquire failed: {outcome:?}");
        outcome.result.as_str().expect("token").to_owned()
    }

    /// Name of the owner of `port_id`, empty when free.
    pub fn owner_of(&self, port_id: u8) -> String {
        self.port(port_id)
            .owner()
            .expect("owner")
            .name()
            .to_owned()
    }

    /// Forces the runtime state of an owned port.
    pub fn set_port_state(&self, port_id: u8, handler: &str, state: PortState) {
        self.port(port_id)
            .with_owner(handler, |data| {
                data.state = state;
                Ok(())
            })
            .expect("port state");
    }

    fn port(&self, port_id: u8) -> &crate::ports::Port {
        self.state().ports().get(port_id).expect("port")
    }
}

/// Fixture providing a fresh [`TestServer`].
#[fixture]
pub fn test_server() -> TestServer {
    TestServer::new()
}
