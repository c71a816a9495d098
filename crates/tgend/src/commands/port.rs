//! Per-port attributes, capture replay, counters and status.

use serde_json::json;

use crate::platform::PushRemote;
use crate::ports::{PortError, PortState};
use crate::rpc::{
    CommandContext, CommandError, OWNER_HANDLER_FIELD, OutcomeBuilder, Params, empty_object,
};

use super::{port, record_port_error};

/// Applies port attributes.
///
/// Only `promiscuous.enabled` is understood. Other attribute keys are
/// accepted and ignored so newer clients can talk to older servers.
pub(super) fn set_port_attr(
    context: &CommandContext<'_>,
    params: &Params<'_>,
    outcome: &mut OutcomeBuilder,
) -> Result<(), CommandError> {
    let port_id = params.port_id(context.state().port_count())?;
    let handler = params.string(OWNER_HANDLER_FIELD)?;
    let attr = params.object("attr")?;
    let promiscuous = if attr.contains("promiscuous") {
        Some(attr.object("promiscuous")?.bool("enabled")?)
    } else {
        None
    };

    let platform = context.state().platform();
    let applied = port(context, port_id)?.with_owner(handler, |data| {
        if let Some(enabled) = promiscuous {
            platform.set_promiscuous(port_id, enabled)?;
            data.promiscuous = enabled;
        }
        Ok(())
    });

    match applied {
        Ok(()) => {
            outcome.set_result(empty_object());
            Ok(())
        }
        Err(error) => record_port_error(outcome, error),
    }
}

/// Starts replaying a capture file on a port that is not transmitting.
pub(super) fn push_remote(
    context: &CommandContext<'_>,
    params: &Params<'_>,
    outcome: &mut OutcomeBuilder,
) -> Result<(), CommandError> {
    let port_id = params.port_id(context.state().port_count())?;
    let handler = params.string(OWNER_HANDLER_FIELD)?;
    let request = PushRemote {
        port_id,
        pcap_filename: params.string("pcap_filename")?.to_owned(),
        ipg_usec: params.double("ipg_usec")?,
        speedup: params.double("speedup")?,
        count: params.uint32("count")?,
        duration: params.double("duration")?,
    };

    let platform = context.state().platform();
    let started = port(context, port_id)?.with_owner(handler, |data| {
        if data.state.is_transmitting() {
            return Err(PortError::Busy {
                port_id,
                state: data.state,
            });
        }
        platform.push_remote(&request)?;
        data.state = PortState::PcapTx;
        Ok(())
    });

    match started {
        Ok(()) => {
            outcome.set_result(empty_object());
            Ok(())
        }
        Err(error) => record_port_error(outcome, error),
    }
}

pub(super) fn get_port_stats(
    context: &CommandContext<'_>,
    params: &Params<'_>,
    outcome: &mut OutcomeBuilder,
) -> Result<(), CommandError> {
    let port_id = params.port_id(context.state().port_count())?;

    match context.state().platform().port_stats(port_id) {
        Ok(stats) => {
            let stats = serde_json::to_value(stats)
                .map_err(|error| CommandError::internal(error.to_string()))?;
            outcome.set_result(stats);
        }
        Err(error) => outcome.report_execution_error(error.to_string()),
    }
    Ok(())
}

pub(super) fn get_port_status(
    context: &CommandContext<'_>,
    params: &Params<'_>,
    outcome: &mut OutcomeBuilder,
) -> Result<(), CommandError> {
    let port_id = params.port_id(context.state().port_count())?;

    match port(context, port_id)?.snapshot() {
        Ok(data) => {
            let state: &'static str = data.state.into();
            outcome.set_result(json!({
                "owner": data.owner.name(),
                "state": state,
                "max_stream_id": data.max_stream_id,
                "attr": {"promiscuous": {"enabled": data.promiscuous}},
            }));
            Ok(())
        }
        Err(error) => record_port_error(outcome, error),
    }
}
