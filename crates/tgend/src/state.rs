//! Shared server state handed to every command.

use std::sync::Arc;

use crate::api_version::ApiVersionTable;
use crate::host::HostInfo;
use crate::platform::PlatformApi;
use crate::ports::PortTable;

/// Everything commands read or mutate, built once at startup.
pub struct ServerState {
    platform: Arc<dyn PlatformApi>,
    ports: PortTable,
    api: ApiVersionTable,
    host: HostInfo,
    dp_core_count: u8,
}

impl ServerState {
    /// Builds state with one port per platform port.
    pub fn new(
        platform: Arc<dyn PlatformApi>,
        api: ApiVersionTable,
        host: HostInfo,
        dp_core_count: u8,
    ) -> Self {
        let ports = PortTable::new(platform.port_count());
        Self {
            platform,
            ports,
            api,
            host,
            dp_core_count,
        }
    }

    /// Data-plane collaborator.
    #[must_use]
    pub fn platform(&self) -> &dyn PlatformApi {
        self.platform.as_ref()
    }

    /// Port table.
    #[must_use]
    pub fn ports(&self) -> &PortTable {
        &self.ports
    }

    /// Negotiable API versions.
    #[must_use]
    pub fn api(&self) -> &ApiVersionTable {
        &self.api
    }

    /// Host identity.
    #[must_use]
    pub fn host(&self) -> &HostInfo {
        &self.host
    }

    /// Number of data-plane cores.
    #[must_use]
    pub fn dp_core_count(&self) -> u8 {
        self.dp_core_count
    }

    /// Number of ports.
    #[must_use]
    pub fn port_count(&self) -> u8 {
        self.ports.len()
    }
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ServerState")
            .field("ports", &self.ports)
            .field("api", &self.api)
            .field("host", &self.host)
            .field("dp_core_count", &self.dp_core_count)
            .finish_non_exhaustive()
    }
}
