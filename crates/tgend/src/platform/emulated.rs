//! In-memory platform used when no packet engine is attached.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde_json::{Map, Value, json};
use tracing::{debug, info};

use super::{CpuUtilization, PlatformApi, PlatformError, PortInfo, PortStats, PushRemote, RxCaps};

const PLATFORM_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::platform");

/// Samples kept per data-plane thread.
pub const CPU_HISTORY_LEN: usize = 20;

const EMULATED_SPEED_MBPS: u32 = 10_000;
const EMULATED_RX_COUNTERS: u32 = 127;
const MBUF_SIZES: [&str; 7] = ["64b", "128b", "256b", "512b", "1024b", "2048b", "4096b"];

#[derive(Debug, Default)]
struct EmulatedPort {
    stats: PortStats,
    promiscuous: bool,
    replays: Vec<PushRemote>,
}

/// Platform whose ports, counters and utilisation live in memory.
///
/// Ports are paired (0 with 1, 2 with 3, ...) and each port's destination
/// MAC is its peer's source MAC, matching a loopback cabling.
#[derive(Debug)]
pub struct EmulatedPlatform {
    info: Vec<PortInfo>,
    ports: Mutex<Vec<EmulatedPort>>,
    active_pgids: Mutex<Vec<u32>>,
    cpu: Vec<CpuUtilization>,
    published: Mutex<Vec<(u32, bool)>>,
    shutdown: AtomicBool,
}

impl EmulatedPlatform {
    /// Builds a platform with `port_count` ports served by `dp_core_count`
    /// data-plane threads.
    #[must_use]
    pub fn new(port_count: u8, dp_core_count: u8) -> Self {
        let info = (0..port_count).map(emulated_port_info).collect();
        let ports = (0..port_count).map(|_| EmulatedPort::default()).collect();
        let cpu = (0..dp_core_count)
            .map(|_| CpuUtilization {
                history: vec![0.0; CPU_HISTORY_LEN],
                port1: 0.0,
                port2: 0.0,
            })
            .collect();
        Self {
            info,
            ports: Mutex::new(ports),
            active_pgids: Mutex::new(Vec::new()),
            cpu,
            published: Mutex::new(Vec::new()),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Marks a packet group ID as carrying flow statistics.
    pub fn activate_pgid(&self, pgid: u32) -> Result<(), PlatformError> {
        let mut ids = lock(&self.active_pgids, "flow statistics")?;
        if let Err(position) = ids.binary_search(&pgid) {
            ids.insert(position, pgid);
        }
        Ok(())
    }

    /// Whether promiscuous receive is enabled on a port.
    pub fn promiscuous(&self, port_id: u8) -> Result<bool, PlatformError> {
        let ports = lock(&self.ports, "port state")?;
        port_entry(&ports, port_id).map(|port| port.promiscuous)
    }

    /// Capture replays started on a port, oldest first.
    pub fn replays(&self, port_id: u8) -> Result<Vec<PushRemote>, PlatformError> {
        let ports = lock(&self.ports, "port state")?;
        port_entry(&ports, port_id).map(|port| port.replays.clone())
    }

    /// Publication flushes requested so far, oldest first.
    pub fn published(&self) -> Result<Vec<(u32, bool)>, PlatformError> {
        Ok(lock(&self.published, "publisher")?.clone())
    }
}

fn emulated_port_info(port_id: u8) -> PortInfo {
    let peer = port_id ^ 1;
    PortInfo {
        driver: "net_emulated".to_owned(),
        speed_mbps: EMULATED_SPEED_MBPS,
        hw_macaddr: mac_for(port_id),
        src_macaddr: mac_for(port_id),
        dst_macaddr: mac_for(peer),
        pci_addr: format!("0000:{:02x}:00.{}", 3 + (port_id >> 1), port_id & 1),
        numa: 0,
        rx_caps: RxCaps::all(),
        rx_counters: EMULATED_RX_COUNTERS,
    }
}

fn mac_for(port_id: u8) -> String {
    format!("00:00:00:01:00:{port_id:02x}")
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &'static str) -> Result<MutexGuard<'a, T>, PlatformError> {
    mutex
        .lock()
        .map_err(|_| PlatformError::unavailable(what, "lock poisoned"))
}

fn port_entry(ports: &[EmulatedPort], port_id: u8) -> Result<&EmulatedPort, PlatformError> {
    ports
        .get(usize::from(port_id))
        .ok_or(PlatformError::UnknownPort { port_id })
}

fn port_entry_mut(
    ports: &mut [EmulatedPort],
    port_id: u8,
) -> Result<&mut EmulatedPort, PlatformError> {
    ports
        .get_mut(usize::from(port_id))
        .ok_or(PlatformError::UnknownPort { port_id })
}

impl PlatformApi for EmulatedPlatform {
    fn port_count(&self) -> u8 {
        u8::try_from(self.info.len()).unwrap_or(u8::MAX)
    }

    fn port_info(&self, port_id: u8) -> Result<PortInfo, PlatformError> {
        self.info
            .get(usize::from(port_id))
            .cloned()
            .ok_or(PlatformError::UnknownPort { port_id })
    }

    fn port_stats(&self, port_id: u8) -> Result<PortStats, PlatformError> {
        let ports = lock(&self.ports, "port statistics")?;
        port_entry(&ports, port_id).map(|port| port.stats)
    }

    fn set_promiscuous(&self, port_id: u8, enabled: bool) -> Result<(), PlatformError> {
        let mut ports = lock(&self.ports, "port state")?;
        port_entry_mut(&mut ports, port_id)?.promiscuous = enabled;
        debug!(target: PLATFORM_TARGET, port_id, enabled, "promiscuous mode updated");
        Ok(())
    }

    fn push_remote(&self, request: &PushRemote) -> Result<(), PlatformError> {
        if !Path::new(&request.pcap_filename).is_file() {
            return Err(PlatformError::rejected(format!(
                "failed to open '{}' for replay",
                request.pcap_filename
            )));
        }
        let mut ports = lock(&self.ports, "port state")?;
        port_entry_mut(&mut ports, request.port_id)?
            .replays
            .push(request.clone());
        info!(
            target: PLATFORM_TARGET,
            port_id = request.port_id,
            file = %request.pcap_filename,
            count = request.count,
            "capture replay started"
        );
        Ok(())
    }

    fn active_pgids(&self) -> Result<Vec<u32>, PlatformError> {
        Ok(lock(&self.active_pgids, "flow statistics")?.clone())
    }

    fn cpu_utilization(&self) -> Result<Vec<CpuUtilization>, PlatformError> {
        Ok(self.cpu.clone())
    }

    fn mbuf_utilization(&self) -> Result<Map<String, Value>, PlatformError> {
        let socket: Map<String, Value> = MBUF_SIZES
            .iter()
            .map(|size| ((*size).to_owned(), json!([0, 16_380])))
            .collect();
        let mut stats = Map::new();
        stats.insert("cpu-socket-0".to_owned(), Value::Object(socket));
        let mut section = Map::new();
        section.insert("mbuf_stats".to_owned(), Value::Object(stats));
        Ok(section)
    }

    fn publish_async_data_now(&self, key: u32, baseline: bool) {
        match lock(&self.published, "publisher") {
            Ok(mut published) => published.push((key, baseline)),
            Err(error) => debug!(target: PLATFORM_TARGET, %error, "publish request dropped"),
        }
    }

    fn mark_for_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        info!(target: PLATFORM_TARGET, "platform marked for shutdown");
    }

    fn is_marked_for_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn platform() -> EmulatedPlatform {
        EmulatedPlatform::new(4, 2)
    }

    #[rstest]
    fn pairs_ports_by_mac(platform: EmulatedPlatform) {
        let port0 = platform.port_info(0).expect("port 0");
        let port1 = platform.port_info(1).expect("port 1");
        assert_eq!(port0.dst_macaddr, port1.src_macaddr);
        assert_eq!(port1.dst_macaddr, port0.src_macaddr);
        assert_eq!(port0.pci_addr, "0000:03:00.0");
        assert_eq!(platform.port_info(3).expect("port 3").pci_addr, "0000:04:00.1");
    }

    #[rstest]
    fn unknown_ports_are_reported(platform: EmulatedPlatform) {
        assert_eq!(
            platform.port_stats(9),
            Err(PlatformError::UnknownPort { port_id: 9 })
        );
    }

    #[rstest]
    fn tracks_promiscuous_mode(platform: EmulatedPlatform) {
        platform.set_promiscuous(2, true).expect("set");
        assert!(platform.promiscuous(2).expect("read"));
        assert!(!platform.promiscuous(3).expect("read"));
    }

    #[rstest]
    fn keeps_active_pgids_sorted_and_unique(platform: EmulatedPlatform) {
        for pgid in [7, 3, 7, 5] {
            platform.activate_pgid(pgid).expect("activate");
        }
        assert_eq!(platform.active_pgids().expect("pgids"), [3, 5, 7]);
    }

    #[rstest]
    fn reports_one_cpu_entry_per_core(platform: EmulatedPlatform) {
        let cpu = platform.cpu_utilization().expect("cpu");
        assert_eq!(cpu.len(), 2);
        assert!(cpu.iter().all(|thread| thread.history.len() == CPU_HISTORY_LEN));
    }

    #[rstest]
    fn refuses_to_replay_missing_capture(platform: EmulatedPlatform) {
        let request = PushRemote {
            port_id: 0,
            pcap_filename: "/nonexistent/capture.pcap".to_owned(),
            ipg_usec: 1.0,
            speedup: 1.0,
            count: 1,
            duration: -1.0,
        };
        assert!(matches!(
            platform.push_remote(&request),
            Err(PlatformError::Rejected { .. })
        ));
        assert!(platform.replays(0).expect("replays").is_empty());
    }

    #[rstest]
    fn shutdown_flag_latches(platform: EmulatedPlatform) {
        assert!(!platform.is_marked_for_shutdown());
        platform.mark_for_shutdown();
        assert!(platform.is_marked_for_shutdown());
    }
}
