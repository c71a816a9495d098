//! Name to handler mapping for RPC commands.
//!
//! The registry is filled once by the composition root and is read-only
//! afterwards, so lookups need no locking. Names are kept in a sorted map so
//! enumeration is deterministic.

use std::collections::BTreeMap;

use thiserror::Error;

use super::context::CommandContext;
use super::errors::CommandError;
use super::outcome::OutcomeBuilder;
use super::params::Params;

/// Signature every command handler implements.
pub type CommandHandler =
    fn(&CommandContext<'_>, &Params<'_>, &mut OutcomeBuilder) -> Result<(), CommandError>;

/// Access checks the dispatcher performs before a handler runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandPolicy {
    /// The request must carry a valid `api_h` token.
    pub api_handler: bool,
    /// The request must carry `port_id` and the owner's `handler` token.
    pub ownership: bool,
}

impl CommandPolicy {
    /// No checks.
    pub const OPEN: Self = Self {
        api_handler: false,
        ownership: false,
    };

    /// Requires a negotiated API handler.
    pub const API: Self = Self {
        api_handler: true,
        ownership: false,
    };

    /// Requires a negotiated API handler and ownership of the target port.
    pub const OWNER: Self = Self {
        api_handler: true,
        ownership: true,
    };
}

/// A registered command.
#[derive(Debug, Clone, Copy)]
pub struct CommandEntry {
    /// Checks applied before the handler runs.
    pub policy: CommandPolicy,
    /// The handler itself.
    pub handler: CommandHandler,
}

/// Errors raised while building the registry. Always fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A second handler was registered under an existing name.
    #[error("command '{name}' is already registered")]
    Duplicate {
        /// Offending name.
        name: String,
    },
    /// The command name was empty or whitespace.
    #[error("command names must not be empty")]
    EmptyName,
}

/// Read-only after startup; see [`crate::commands::build_registry`].
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, CommandEntry>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the name is empty or already taken.
    pub fn register(
        &mut self,
        name: &str,
        policy: CommandPolicy,
        handler: CommandHandler,
    ) -> Result<(), RegistryError> {
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.commands.contains_key(name) {
            return Err(RegistryError::Duplicate {
                name: name.to_owned(),
            });
        }
        self.commands
            .insert(name.to_owned(), CommandEntry { policy, handler });
        Ok(())
    }

    /// Looks up a command by exact name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&CommandEntry> {
        self.commands.get(name)
    }

    /// Registered names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    fn noop(
        _: &CommandContext<'_>,
        _: &Params<'_>,
        _: &mut OutcomeBuilder,
    ) -> Result<(), CommandError> {
        Ok(())
    }

    #[fixture]
    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        for name in ["ping", "acquire", "get_cmds"] {
            registry
                .register(name, CommandPolicy::OPEN, noop)
                .expect("register");
        }
        registry
    }

    #[rstest]
    fn enumerates_names_lexicographically(registry: CommandRegistry) {
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, ["acquire", "get_cmds", "ping"]);
    }

    #[rstest]
    fn rejects_duplicate_names(mut registry: CommandRegistry) {
        let error = registry
            .register("ping", CommandPolicy::API, noop)
            .expect_err("duplicate");
        assert_eq!(
            error,
            RegistryError::Duplicate {
                name: "ping".to_owned()
            }
        );
        assert_eq!(registry.len(), 3);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn rejects_empty_names(mut registry: CommandRegistry, #[case] name: &str) {
        assert_eq!(
            registry.register(name, CommandPolicy::OPEN, noop),
            Err(RegistryError::EmptyName)
        );
    }

    #[rstest]
    fn lookup_is_exact(registry: CommandRegistry) {
        assert!(registry.lookup("ping").is_some());
        assert!(registry.lookup("PING").is_none());
        assert!(registry.lookup("pin").is_none());
    }
}
