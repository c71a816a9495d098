//! Read-only queries over the platform and host.
//!
//! These handlers reshape what the platform reports into fixed result
//! layouts. A failed platform query aborts with `INTERNAL_ERROR`; no partial
//! result is returned.

use serde_json::{Map, Value, json};

use crate::platform::PortInfo;
use crate::rpc::{CommandContext, CommandError, OutcomeBuilder, Params, empty_object};

use super::query_failed;

const MBPS_PER_GBPS: u32 = 1000;

/// Packet group IDs with active flow statistics.
pub(super) fn get_active_pgids(
    context: &CommandContext<'_>,
    _params: &Params<'_>,
    outcome: &mut OutcomeBuilder,
) -> Result<(), CommandError> {
    let ids = context
        .state()
        .platform()
        .active_pgids()
        .map_err(query_failed)?;
    outcome.set_result(json!({"ids": ids}));
    Ok(())
}

/// Memory buffer utilisation merged with per-thread CPU history.
pub(super) fn get_utilization(
    context: &CommandContext<'_>,
    _params: &Params<'_>,
    outcome: &mut OutcomeBuilder,
) -> Result<(), CommandError> {
    let platform = context.state().platform();
    let mut result = platform.mbuf_utilization().map_err(query_failed)?;
    let cpu: Vec<Value> = platform
        .cpu_utilization()
        .map_err(query_failed)?
        .into_iter()
        .map(|thread| {
            json!({
                "history": thread.history,
                "ports": [thread.port1, thread.port2],
            })
        })
        .collect();
    result.insert("cpu".to_owned(), Value::Array(cpu));
    outcome.set_result(result);
    Ok(())
}

pub(super) fn get_sys_info(
    context: &CommandContext<'_>,
    _params: &Params<'_>,
    outcome: &mut OutcomeBuilder,
) -> Result<(), CommandError> {
    let state = context.state();
    let port_count = state.port_count();
    let dp_core_count = state.dp_core_count();
    let dp_core_count_per_port = dp_core_count.checked_div(port_count >> 1).unwrap_or(0);

    let ports = state
        .ports()
        .iter()
        .map(|port| {
            state
                .platform()
                .port_info(port.id())
                .map(|info| describe_port(port.id(), &info))
                .map_err(query_failed)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut result = Map::new();
    result.insert("hostname".to_owned(), json!(state.host().hostname()));
    result.insert("uptime".to_owned(), json!(state.host().uptime()));
    result.insert("dp_core_count".to_owned(), json!(dp_core_count));
    result.insert(
        "dp_core_count_per_port".to_owned(),
        json!(dp_core_count_per_port),
    );
    result.insert("core_type".to_owned(), json!(state.host().cpu_model()));
    result.insert("port_count".to_owned(), json!(port_count));
    result.insert("ports".to_owned(), Value::Array(ports));
    outcome.set_result(result);
    Ok(())
}

fn describe_port(index: u8, info: &PortInfo) -> Value {
    let caps: Vec<&str> = info.rx_caps.names().collect();
    json!({
        "index": index,
        "driver": info.driver,
        "hw_macaddr": info.hw_macaddr,
        "src_macaddr": info.src_macaddr,
        "dst_macaddr": info.dst_macaddr,
        "pci_addr": info.pci_addr,
        "numa": info.numa,
        "rx": {"caps": caps, "counters": info.rx_counters},
        "speed": info.speed_mbps.checked_div(MBPS_PER_GBPS).unwrap_or_default(),
    })
}

/// Publishes pending asynchronous data immediately.
pub(super) fn publish_now(
    context: &CommandContext<'_>,
    params: &Params<'_>,
    outcome: &mut OutcomeBuilder,
) -> Result<(), CommandError> {
    let key = params.uint32("key")?;
    let baseline = params.bool("baseline")?;

    context
        .state()
        .platform()
        .publish_async_data_now(key, baseline);
    outcome.set_result(empty_object());
    Ok(())
}
