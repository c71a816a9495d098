//! Ownership record bound to a port.

use rand::Rng;
use rand::distributions::Alphanumeric;

/// Length of generated handler tokens.
pub const HANDLER_LEN: usize = 8;

/// Generates a random alphanumeric handler token.
#[must_use]
pub fn generate_handler() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(HANDLER_LEN)
        .map(char::from)
        .collect()
}

/// Who holds a port, and the capability token they were issued.
///
/// A free port has an empty name, no handler and no session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortOwner {
    name: String,
    handler: String,
    session_id: u32,
}

impl PortOwner {
    /// Whether nobody holds the port.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.name.is_empty()
    }

    /// Whether `name` holds the port.
    #[must_use]
    pub fn is_owned_by(&self, name: &str) -> bool {
        !self.is_free() && self.name == name
    }

    /// Whether `handler` is the token issued to the current owner.
    #[must_use]
    pub fn verify(&self, handler: &str) -> bool {
        !self.is_free() && self.handler == handler
    }

    /// Owner name; empty when free.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current handler token; empty when free.
    #[must_use]
    pub fn handler(&self) -> &str {
        &self.handler
    }

    /// Session the owner acquired from.
    #[must_use]
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Binds the port to `name`, issuing a token different from the
    /// previous one.
    pub(super) fn own(&mut self, name: &str, session_id: u32) -> &str {
        let mut handler = generate_handler();
        while handler == self.handler {
            handler = generate_handler();
        }
        self.name = name.to_owned();
        self.handler = handler;
        self.session_id = session_id;
        &self.handler
    }

    /// Clears the binding.
    pub(super) fn release(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_owner_is_free() {
        let owner = PortOwner::default();
        assert!(owner.is_free());
        assert!(!owner.is_owned_by(""));
        assert!(!owner.verify(""));
    }

    #[test]
    fn own_issues_fresh_token() {
        let mut owner = PortOwner::default();
        let first = owner.own("alice", 100).to_owned();
        let second = owner.own("alice", 100).to_owned();
        assert_eq!(first.len(), HANDLER_LEN);
        assert_ne!(first, second);
        assert!(owner.verify(&second));
        assert!(!owner.verify(&first));
    }

    #[test]
    fn release_clears_every_field() {
        let mut owner = PortOwner::default();
        owner.own("alice", 7);
        owner.release();
        assert_eq!(owner, PortOwner::default());
    }

    #[test]
    fn handlers_are_alphanumeric() {
        let handler = generate_handler();
        assert!(handler.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
