//! Control-plane daemon for the traffic generator.
//!
//! The daemon accepts JSONL requests on a Unix or TCP socket configured via
//! [`tgen_config`], validates their parameters, and dispatches them to typed
//! command handlers that query or mutate the data-plane platform. Results
//! and errors travel back as one response line per request.
//!
//! Two protocols guard shared state. Clients first negotiate an API version
//! with `sync`, which hands out an `api_h` token that privileged
//! commands must echo. Ports are then owned exclusively: `acquire` issues a
//! per-port handler token, and every command that mutates a port must
//! present the current token. A forced takeover issues a new token, so the
//! previous holder is locked out immediately.
//!
//! Command handlers never abort on domain failures. Ownership conflicts,
//! version mismatches and refused platform calls are recorded against the
//! response while the rest of a batch is still evaluated; only malformed
//! parameters and server faults stop a command outright.

mod api_version;
mod bootstrap;
mod commands;
mod health;
mod host;
mod platform;
mod ports;
mod process;
mod rpc;
mod state;
mod telemetry;
mod transport;

pub use api_version::{ApiClass, ApiVersion, ApiVersionError, ApiVersionTable};
pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
    emulated_platform,
};
pub use commands::build_registry;
pub use health::{HealthReporter, StructuredHealthReporter};
pub use host::HostInfo;
pub use platform::{
    CpuUtilization, EmulatedPlatform, PlatformApi, PlatformError, PortInfo, PortStats,
    PushRemote, RxCaps,
};
pub use ports::{Port, PortData, PortError, PortOwner, PortState, PortTable};
pub use process::{
    LaunchError, ShutdownError, ShutdownReason, ShutdownSignal, SystemShutdownSignal, run_daemon,
};
pub use rpc::{
    CommandContext, CommandError, CommandPolicy, CommandRegistry, DispatchError, Dispatcher,
    Outcome, OutcomeBuilder, ParamError, ParamReason, Params, RegistryError, RpcConnectionHandler,
    RpcError, RpcRequest, RpcResponse, StatusCode,
};
pub use state::ServerState;
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ListenerError;

#[cfg(test)]
mod tests;
