//! Boundary to the data-plane platform.
//!
//! Commands never touch hardware or the packet engine directly. Everything
//! they need from below (port properties, counters, utilisation samples, the
//! shutdown flag) is reached through [`PlatformApi`]. The daemon ships with
//! [`EmulatedPlatform`], an in-memory implementation that keeps the control
//! plane usable without a packet engine attached.

mod emulated;

use bitflags::bitflags;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub use self::emulated::EmulatedPlatform;

bitflags! {
    /// Receive-side statistics a port can collect.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RxCaps: u16 {
        /// Per-flow packet statistics keyed by IPv4 identification.
        const FLOW_STATS = 0x1;
        /// Latency measurement from payload timestamps.
        const LATENCY = 0x2;
        /// Byte counting on received flows.
        const RX_BYTES = 0x4;
    }
}

impl RxCaps {
    const NAMES: [(Self, &'static str); 3] = [
        (Self::FLOW_STATS, "flow_stats"),
        (Self::LATENCY, "latency"),
        (Self::RX_BYTES, "rx_bytes"),
    ];

    /// Names of the capabilities present, in table order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMES
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, name)| name)
    }
}

/// Static properties of one port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Driver name, e.g. `net_ixgbe`.
    pub driver: String,
    /// Link speed in Mb/s.
    pub speed_mbps: u32,
    /// Burned-in MAC address.
    pub hw_macaddr: String,
    /// Source MAC written into transmitted frames.
    pub src_macaddr: String,
    /// Destination MAC written into transmitted frames.
    pub dst_macaddr: String,
    /// PCI address.
    pub pci_addr: String,
    /// NUMA node, `-1` when unknown.
    pub numa: i32,
    /// Receive capabilities.
    pub rx_caps: RxCaps,
    /// Number of receive counters the port supports.
    pub rx_counters: u32,
}

/// Counters reported by `get_port_stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PortStats {
    /// Packets transmitted.
    pub opackets: u64,
    /// Packets received.
    pub ipackets: u64,
    /// Bytes transmitted.
    pub obytes: u64,
    /// Bytes received.
    pub ibytes: u64,
    /// Transmit errors.
    pub oerrors: u64,
    /// Receive errors.
    pub ierrors: u64,
    /// Transmit rate in bits per second.
    pub tx_bps: f64,
    /// Receive rate in bits per second.
    pub rx_bps: f64,
    /// Transmit rate in packets per second.
    pub tx_pps: f64,
    /// Receive rate in packets per second.
    pub rx_pps: f64,
}

/// Utilisation of one data-plane thread.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuUtilization {
    /// Most recent samples, newest first, bounded in length.
    pub history: Vec<f64>,
    /// Share attributed to the first port of the thread's pair.
    pub port1: f64,
    /// Share attributed to the second port of the thread's pair.
    pub port2: f64,
}

/// Request to replay a capture file from the server's filesystem.
#[derive(Debug, Clone, PartialEq)]
pub struct PushRemote {
    /// Target port.
    pub port_id: u8,
    /// Capture file path on the server.
    pub pcap_filename: String,
    /// Inter-packet gap in microseconds.
    pub ipg_usec: f64,
    /// Replay speed multiplier.
    pub speedup: f64,
    /// Number of passes over the file.
    pub count: u32,
    /// Maximum duration in seconds; negative means unbounded.
    pub duration: f64,
}

/// Failures reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The port index is not known to the platform.
    #[error("port {port_id} does not exist")]
    UnknownPort {
        /// Requested port.
        port_id: u8,
    },
    /// A query could not be answered.
    #[error("{what} is unavailable: {message}")]
    Unavailable {
        /// What was queried.
        what: &'static str,
        /// Diagnostic from the platform.
        message: String,
    },
    /// An operation was refused.
    #[error("{message}")]
    Rejected {
        /// Diagnostic from the platform.
        message: String,
    },
}

impl PlatformError {
    /// Creates an unavailable-query error.
    pub fn unavailable(what: &'static str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            what,
            message: message.into(),
        }
    }

    /// Creates a refused-operation error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

/// Operations the command layer needs from the data plane.
pub trait PlatformApi: Send + Sync {
    /// Number of ports the platform exposes.
    fn port_count(&self) -> u8;

    /// Static properties of a port.
    fn port_info(&self, port_id: u8) -> Result<PortInfo, PlatformError>;

    /// Current counters of a port.
    fn port_stats(&self, port_id: u8) -> Result<PortStats, PlatformError>;

    /// Enables or disables promiscuous receive on a port.
    fn set_promiscuous(&self, port_id: u8, enabled: bool) -> Result<(), PlatformError>;

    /// Starts replaying a capture file.
    fn push_remote(&self, request: &PushRemote) -> Result<(), PlatformError>;

    /// Packet group IDs with active flow statistics.
    fn active_pgids(&self) -> Result<Vec<u32>, PlatformError>;

    /// Per-thread CPU utilisation.
    fn cpu_utilization(&self) -> Result<Vec<CpuUtilization>, PlatformError>;

    /// Memory buffer utilisation, merged into the utilisation result as-is.
    fn mbuf_utilization(&self) -> Result<Map<String, Value>, PlatformError>;

    /// Flushes pending asynchronous publications immediately.
    fn publish_async_data_now(&self, key: u32, baseline: bool);

    /// Asks the process to stop at the next opportunity.
    fn mark_for_shutdown(&self);

    /// Whether shutdown has been requested.
    fn is_marked_for_shutdown(&self) -> bool;
}
