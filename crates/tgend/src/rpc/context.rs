//! Borrowed view of the server that a handler runs against.

use crate::state::ServerState;

use super::registry::CommandRegistry;

/// What a command handler may consult while it runs.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    state: &'a ServerState,
    registry: &'a CommandRegistry,
}

impl<'a> CommandContext<'a> {
    /// Creates a context over `state` and `registry`.
    #[must_use]
    pub fn new(state: &'a ServerState, registry: &'a CommandRegistry) -> Self {
        Self { state, registry }
    }

    /// Shared server state.
    #[must_use]
    pub fn state(&self) -> &'a ServerState {
        self.state
    }

    /// Command registry, for introspection.
    #[must_use]
    pub fn registry(&self) -> &'a CommandRegistry {
        self.registry
    }
}
