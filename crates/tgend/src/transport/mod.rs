//! Socket listener for the control-plane endpoint.
//!
//! The transport binds the configured Unix or TCP endpoint, accepts
//! connections on a background thread and hands each one to a
//! [`ConnectionHandler`] on its own worker thread. It knows nothing about the
//! request format carried over the connection.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod listener_tests;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub(crate) use self::handler::{ConnectionHandler, ConnectionStream};
pub(crate) use self::listener::SocketListener;
#[cfg(test)]
pub(crate) use self::test_utils::{CountingHandler, wait_until};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
