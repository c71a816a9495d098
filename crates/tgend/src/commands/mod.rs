//! Command handlers and the registry that names them.
//!
//! Handlers follow one shape: read every parameter first (a failure aborts
//! with `PARAM_ERROR`), then act. Refusals from the ownership protocol or
//! the platform are recorded on the [`OutcomeBuilder`] as execution errors;
//! only server faults abort with [`CommandError::Internal`].

mod api_sync;
mod general;
mod ownership;
mod port;
mod query;

use crate::platform::PlatformError;
use crate::ports::{Port, PortError};
use crate::rpc::{
    CommandContext, CommandError, CommandPolicy, CommandRegistry, OutcomeBuilder, RegistryError,
};

/// Builds the registry holding every command the daemon serves.
///
/// # Errors
///
/// Returns [`RegistryError`] if two commands share a name.
pub fn build_registry() -> Result<CommandRegistry, RegistryError> {
    let mut registry = CommandRegistry::new();

    registry.register("ping", CommandPolicy::OPEN, general::ping)?;
    registry.register("get_cmds", CommandPolicy::OPEN, general::get_cmds)?;
    registry.register("get_version", CommandPolicy::OPEN, general::get_version)?;
    registry.register("shutdown", CommandPolicy::API, general::shutdown)?;

    registry.register("sync", CommandPolicy::OPEN, api_sync::sync)?;

    registry.register("acquire", CommandPolicy::API, ownership::acquire)?;
    registry.register("release", CommandPolicy::OWNER, ownership::release)?;
    registry.register("get_owner", CommandPolicy::OPEN, ownership::get_owner)?;

    registry.register("set_port_attr", CommandPolicy::OWNER, port::set_port_attr)?;
    registry.register("push_remote", CommandPolicy::OWNER, port::push_remote)?;
    registry.register("get_port_stats", CommandPolicy::OPEN, port::get_port_stats)?;
    registry.register("get_port_status", CommandPolicy::OPEN, port::get_port_status)?;

    registry.register("get_active_pgids", CommandPolicy::OPEN, query::get_active_pgids)?;
    registry.register("get_utilization", CommandPolicy::OPEN, query::get_utilization)?;
    registry.register("get_sys_info", CommandPolicy::OPEN, query::get_sys_info)?;
    registry.register("publish_now", CommandPolicy::OPEN, query::publish_now)?;

    Ok(registry)
}

/// Port `port_id`, which the validated parameter guarantees exists.
fn port<'a>(context: &CommandContext<'a>, port_id: u8) -> Result<&'a Port, CommandError> {
    context
        .state()
        .ports()
        .get(port_id)
        .ok_or_else(|| CommandError::internal(format!("port {port_id} is missing")))
}

/// Records a refused port operation, or aborts on a server fault.
fn record_port_error(outcome: &mut OutcomeBuilder, error: PortError) -> Result<(), CommandError> {
    if error.is_internal() {
        return Err(CommandError::internal(error.to_string()));
    }
    outcome.report_execution_error(error.to_string());
    Ok(())
}

/// A failed platform query leaves nothing to report.
fn query_failed(error: PlatformError) -> CommandError {
    CommandError::internal(error.to_string())
}
