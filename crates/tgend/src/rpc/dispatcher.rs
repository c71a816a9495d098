//! Resolves commands and runs them inside a uniform error envelope.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::ports::PortError;
use crate::state::ServerState;

use super::context::CommandContext;
use super::errors::CommandError;
use super::outcome::{Outcome, OutcomeBuilder, StatusCode};
use super::params::Params;
use super::registry::{CommandEntry, CommandPolicy, CommandRegistry};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Field carrying the negotiated API handler.
pub const API_HANDLER_FIELD: &str = "api_h";

/// Field carrying the port owner's handler token.
pub const OWNER_HANDLER_FIELD: &str = "handler";

/// Message returned when `api_h` names no negotiated API.
pub const API_MISMATCH: &str = "API mismatch";

/// Executes commands against shared server state.
///
/// The dispatcher owns the registry, which is immutable once built, and
/// shares the server state with whoever else needs it (the process
/// supervisor watches the platform's shutdown flag through it).
#[derive(Debug)]
pub struct Dispatcher {
    registry: CommandRegistry,
    state: Arc<ServerState>,
}

impl Dispatcher {
    /// Creates a dispatcher over a fully built registry.
    #[must_use]
    pub fn new(registry: CommandRegistry, state: Arc<ServerState>) -> Self {
        Self { registry, state }
    }

    /// Registered commands.
    #[must_use]
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Shared server state.
    #[must_use]
    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// Runs command `name` with request parameters `params`.
    ///
    /// Unknown names yield `UNKNOWN_COMMAND` without running anything. The
    /// command's access policy is checked before its handler runs; a failed
    /// check means the handler never sees the request.
    pub fn execute(&self, name: &str, params: &Value) -> Outcome {
        let Some(entry) = self.registry.lookup(name) else {
            debug!(target: DISPATCH_TARGET, command = name, "unknown command");
            return Outcome::unknown_command(name);
        };

        let outcome = match Params::root(params) {
            Ok(params) => self.run(entry, &params),
            Err(error) => Outcome::param_error(&error),
        };

        if outcome.status == StatusCode::ExecuteError {
            for error in &outcome.errors {
                warn!(
                    target: DISPATCH_TARGET,
                    command = name,
                    error = %error.message,
                    "execution error recorded"
                );
            }
        }
        debug!(
            target: DISPATCH_TARGET,
            command = name,
            status = %outcome.status,
            "command executed"
        );
        outcome
    }

    fn run(&self, entry: &CommandEntry, params: &Params<'_>) -> Outcome {
        if let Err(rejection) = self.check_policy(entry.policy, params) {
            return rejection;
        }

        let context = CommandContext::new(&self.state, &self.registry);
        let mut builder = OutcomeBuilder::new();
        match (entry.handler)(&context, params, &mut builder) {
            Ok(()) => builder.finish(),
            Err(CommandError::Param(error)) => Outcome::param_error(&error),
            Err(CommandError::Internal { message }) => {
                warn!(target: DISPATCH_TARGET, %message, "command failed internally");
                Outcome::internal_error(message)
            }
        }
    }

    fn check_policy(&self, policy: CommandPolicy, params: &Params<'_>) -> Result<(), Outcome> {
        if policy.api_handler {
            let token = params
                .string(API_HANDLER_FIELD)
                .map_err(|error| Outcome::param_error(&error))?;
            if !self.state.api().is_valid_handler(token) {
                return Err(Outcome::execute_error(API_MISMATCH));
            }
        }

        if policy.ownership {
            let port_id = params
                .port_id(self.state.port_count())
                .map_err(|error| Outcome::param_error(&error))?;
            let handler = params
                .string(OWNER_HANDLER_FIELD)
                .map_err(|error| Outcome::param_error(&error))?;
            let port = self
                .state
                .ports()
                .get(port_id)
                .ok_or_else(|| Outcome::internal_error(format!("port {port_id} is missing")))?;
            port.verify_handler(handler).map_err(port_rejection)?;
        }

        Ok(())
    }
}

fn port_rejection(error: PortError) -> Outcome {
    if error.is_internal() {
        Outcome::internal_error(error.to_string())
    } else {
        Outcome::execute_error(error.to_string())
    }
}
