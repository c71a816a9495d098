//! Port acquisition and release.

use serde_json::{Value, json};

use crate::rpc::{
    CommandContext, CommandError, OWNER_HANDLER_FIELD, OutcomeBuilder, Params, empty_object,
};

use super::{port, record_port_error};

/// Takes ownership of a port and returns the new handler token.
///
/// The token is only returned on success; a refused acquire leaves the
/// result empty so a client cannot mistake another owner's token for its
/// own.
pub(super) fn acquire(
    context: &CommandContext<'_>,
    params: &Params<'_>,
    outcome: &mut OutcomeBuilder,
) -> Result<(), CommandError> {
    let port_id = params.port_id(context.state().port_count())?;
    let user = params.non_empty_string("user")?;
    let session_id = params.uint32("session_id")?;
    let force = params.bool("force")?;

    match port(context, port_id)?.acquire(user, session_id, force) {
        Ok(handler) => {
            outcome.set_result(Value::String(handler));
            Ok(())
        }
        Err(error) => record_port_error(outcome, error),
    }
}

pub(super) fn release(
    context: &CommandContext<'_>,
    params: &Params<'_>,
    outcome: &mut OutcomeBuilder,
) -> Result<(), CommandError> {
    let port_id = params.port_id(context.state().port_count())?;
    let handler = params.string(OWNER_HANDLER_FIELD)?;

    match port(context, port_id)?.release(handler) {
        Ok(()) => {
            outcome.set_result(empty_object());
            Ok(())
        }
        Err(error) => record_port_error(outcome, error),
    }
}

/// Name of the port's owner; empty when the port is free.
pub(super) fn get_owner(
    context: &CommandContext<'_>,
    params: &Params<'_>,
    outcome: &mut OutcomeBuilder,
) -> Result<(), CommandError> {
    let port_id = params.port_id(context.state().port_count())?;

    match port(context, port_id)?.owner() {
        Ok(owner) => {
            outcome.set_result(json!({"owner": owner.name()}));
            Ok(())
        }
        Err(error) => record_port_error(outcome, error),
    }
}
