//! Port table and the exclusive-ownership protocol.
//!
//! Each [`Port`] guards its mutable fields with its own mutex, so operations
//! on different ports never contend and every read of a port observes a
//! whole owner tuple. Mutations that require ownership go through
//! [`Port::with_owner`], which checks the caller's handler token and applies
//! the change under the same lock, so a forced takeover cannot interleave
//! between the check and the effect.

mod owner;

use std::sync::{Mutex, MutexGuard};

use strum::{Display, IntoStaticStr};
use thiserror::Error;
use tracing::info;

use crate::platform::PlatformError;

pub use self::owner::{HANDLER_LEN, PortOwner, generate_handler};

/// Tracing target for ownership transitions.
pub(crate) const PORTS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::ports");

/// Runtime state of a port, rendered in its wire form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PortState {
    /// Link is down.
    Down,
    /// No streams configured.
    #[default]
    Idle,
    /// Streams configured, not transmitting.
    Streams,
    /// Transmitting.
    Tx,
    /// Transmission paused.
    Pause,
    /// Replaying a capture file.
    PcapTx,
}

impl PortState {
    /// Whether the port is busy with stream transmission.
    #[must_use]
    pub fn is_transmitting(self) -> bool {
        matches!(self, Self::Tx | Self::Pause)
    }
}

/// Failures of ownership and port-state operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    /// Another client holds the port.
    #[error("port {port_id} is already owned by '{owner}'")]
    OwnershipConflict {
        /// Port index.
        port_id: u8,
        /// Current owner name.
        owner: String,
    },
    /// The port is free.
    #[error("port {port_id} is not owned")]
    NotAcquired {
        /// Port index.
        port_id: u8,
    },
    /// The presented handler is not the current owner's token.
    #[error("port {port_id} is not owned by this handler")]
    HandlerMismatch {
        /// Port index.
        port_id: u8,
    },
    /// The port state does not allow the operation.
    #[error("port {port_id} is in state {state}")]
    Busy {
        /// Port index.
        port_id: u8,
        /// Current state.
        state: PortState,
    },
    /// The platform refused or failed the operation.
    #[error(transparent)]
    Platform(#[from] PlatformError),
    /// A thread panicked while holding the port lock.
    #[error("port {port_id} state is unavailable")]
    Poisoned {
        /// Port index.
        port_id: u8,
    },
}

impl PortError {
    /// Whether the failure is a server fault rather than a refused request.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Poisoned { .. })
    }
}

/// Mutable fields of a port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortData {
    /// Ownership record.
    pub owner: PortOwner,
    /// Runtime state.
    pub state: PortState,
    /// Promiscuous receive attribute.
    pub promiscuous: bool,
    /// Highest stream ID configured on the port.
    pub max_stream_id: u32,
}

/// One traffic-generation port.
#[derive(Debug)]
pub struct Port {
    id: u8,
    data: Mutex<PortData>,
}

impl Port {
    /// Creates a free, idle port.
    #[must_use]
    pub fn new(id: u8) -> Self {
        Self {
            id,
            data: Mutex::new(PortData::default()),
        }
    }

    /// Port index.
    #[must_use]
    pub fn id(&self) -> u8 {
        self.id
    }

    fn lock(&self) -> Result<MutexGuard<'_, PortData>, PortError> {
        self.data
            .lock()
            .map_err(|_| PortError::Poisoned { port_id: self.id })
    }

    /// Consistent copy of the port's mutable fields.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Poisoned`] if the port lock is poisoned.
    pub fn snapshot(&self) -> Result<PortData, PortError> {
        Ok(self.lock()?.clone())
    }

    /// Current ownership record.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Poisoned`] if the port lock is poisoned.
    pub fn owner(&self) -> Result<PortOwner, PortError> {
        Ok(self.lock()?.owner.clone())
    }

    /// Binds the port to `name` and returns the new handler token.
    ///
    /// Succeeds when the port is free, already held by `name`, or `force` is
    /// set. Every success issues a new token, so any token handed out before
    /// stops working.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::OwnershipConflict`] naming the current owner when
    /// another client holds the port and `force` is not set.
    pub fn acquire(&self, name: &str, session_id: u32, force: bool) -> Result<String, PortError> {
        let mut data = self.lock()?;
        let owner = &mut data.owner;
        if !(owner.is_free() || owner.is_owned_by(name) || force) {
            return Err(PortError::OwnershipConflict {
                port_id: self.id,
                owner: owner.name().to_owned(),
            });
        }

        let previous = owner.name().to_owned();
        let handler = owner.own(name, session_id).to_owned();
        info!(
            target: PORTS_TARGET,
            port_id = self.id,
            previous_owner = %previous,
            owner = name,
            session_id,
            force,
            "port acquired"
        );
        Ok(handler)
    }

    /// Frees the port if `handler` is the current owner's token.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::NotAcquired`] for a free port and
    /// [`PortError::HandlerMismatch`] for a stale or foreign token.
    pub fn release(&self, handler: &str) -> Result<(), PortError> {
        self.with_owner(handler, |data| {
            let previous = data.owner.name().to_owned();
            data.owner.release();
            info!(
                target: PORTS_TARGET,
                port_id = self.id,
                previous_owner = %previous,
                "port released"
            );
            Ok(())
        })
    }

    /// Checks that `handler` is the current owner's token.
    ///
    /// # Errors
    ///
    /// See [`Port::release`].
    pub fn verify_handler(&self, handler: &str) -> Result<(), PortError> {
        self.with_owner(handler, |_| Ok(()))
    }

    /// Runs `action` on the port's fields while holding its lock, after
    /// checking that `handler` belongs to the current owner.
    ///
    /// # Errors
    ///
    /// Returns the ownership failure, or whatever `action` returns.
    pub fn with_owner<T>(
        &self,
        handler: &str,
        action: impl FnOnce(&mut PortData) -> Result<T, PortError>,
    ) -> Result<T, PortError> {
        let mut data = self.lock()?;
        if data.owner.is_free() {
            return Err(PortError::NotAcquired { port_id: self.id });
        }
        if !data.owner.verify(handler) {
            return Err(PortError::HandlerMismatch { port_id: self.id });
        }
        action(&mut data)
    }
}

/// Fixed set of ports created at startup.
#[derive(Debug)]
pub struct PortTable {
    ports: Vec<Port>,
}

impl PortTable {
    /// Creates `count` free ports numbered from zero.
    #[must_use]
    pub fn new(count: u8) -> Self {
        Self {
            ports: (0..count).map(Port::new).collect(),
        }
    }

    /// Number of ports.
    #[must_use]
    pub fn len(&self) -> u8 {
        u8::try_from(self.ports.len()).unwrap_or(u8::MAX)
    }

    /// Whether the table has no ports.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Port by index.
    #[must_use]
    pub fn get(&self, port_id: u8) -> Option<&Port> {
        self.ports.get(usize::from(port_id))
    }

    /// All ports in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn port() -> Port {
        Port::new(0)
    }

    #[rstest]
    fn acquire_free_port(port: Port) {
        let handler = port.acquire("alice", 100, false).expect("acquire");
        let owner = port.owner().expect("owner");
        assert!(owner.is_owned_by("alice"));
        assert_eq!(owner.handler(), handler);
        assert_eq!(owner.session_id(), 100);
    }

    #[rstest]
    fn reacquire_by_same_owner_refreshes_token(port: Port) {
        let first = port.acquire("alice", 100, false).expect("first");
        let second = port.acquire("alice", 101, false).expect("second");
        assert_ne!(first, second);
        assert_eq!(port.owner().expect("owner").session_id(), 101);
        assert_eq!(
            port.verify_handler(&first),
            Err(PortError::HandlerMismatch { port_id: 0 })
        );
    }

    #[rstest]
    fn conflicting_acquire_leaves_owner_unchanged(port: Port) {
        let handler = port.acquire("alice", 100, false).expect("alice");
        let error = port.acquire("bob", 200, false).expect_err("conflict");
        assert_eq!(
            error,
            PortError::OwnershipConflict {
                port_id: 0,
                owner: "alice".to_owned()
            }
        );
        let owner = port.owner().expect("owner");
        assert!(owner.is_owned_by("alice"));
        assert_eq!(owner.handler(), handler);
    }

    #[rstest]
    fn forced_acquire_invalidates_previous_token(port: Port) {
        let stale = port.acquire("alice", 100, false).expect("alice");
        let fresh = port.acquire("bob", 200, true).expect("forced");
        assert_ne!(stale, fresh);
        assert!(port.release(&stale).is_err());
        assert!(port.owner().expect("owner").is_owned_by("bob"));
    }

    #[rstest]
    fn release_requires_owner(port: Port) {
        assert_eq!(port.release("whatever"), Err(PortError::NotAcquired { port_id: 0 }));
        let handler = port.acquire("alice", 1, false).expect("acquire");
        port.release(&handler).expect("release");
        assert!(port.owner().expect("owner").is_free());
        port.acquire("bob", 2, false).expect("free after release");
    }

    #[rstest]
    fn with_owner_applies_change_atomically(port: Port) {
        let handler = port.acquire("alice", 1, false).expect("acquire");
        port.with_owner(&handler, |data| {
            data.promiscuous = true;
            Ok(())
        })
        .expect("mutate");
        assert!(port.snapshot().expect("snapshot").promiscuous);
    }

    #[rstest]
    #[case(PortState::Tx, true)]
    #[case(PortState::Pause, true)]
    #[case(PortState::Idle, false)]
    #[case(PortState::PcapTx, false)]
    fn transmitting_states(#[case] state: PortState, #[case] expected: bool) {
        assert_eq!(state.is_transmitting(), expected);
    }

    #[test]
    fn state_renders_in_wire_form() {
        assert_eq!(PortState::PcapTx.to_string(), "PCAP_TX");
        assert_eq!(PortState::Idle.to_string(), "IDLE");
    }

    #[test]
    fn concurrent_acquires_elect_single_owner() {
        let port = Arc::new(Port::new(0));
        let handles: Vec<_> = ["alice", "bob", "carol", "dave"]
            .into_iter()
            .map(|name| {
                let port = Arc::clone(&port);
                thread::spawn(move || port.acquire(name, 0, false).is_ok())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|handle| handle.join().expect("join"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
