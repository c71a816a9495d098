//! JSONL command protocol: request parsing, parameter validation, command
//! registry, dispatch and response encoding.
//!
//! A request line names a command and carries a `params` object. The
//! [`Dispatcher`] looks the command up in the [`CommandRegistry`], checks its
//! access policy, and runs the handler with a [`Params`] view over the
//! request and an [`OutcomeBuilder`] collecting the result. Handlers read
//! every parameter before touching any state; a [`ParamError`] aborts the
//! command, whereas execution errors are recorded and processing continues.

mod connection;
mod context;
mod dispatcher;
mod errors;
mod outcome;
mod params;
mod registry;
mod request;
mod response;
mod value;

pub use self::connection::RpcConnectionHandler;
pub use self::context::CommandContext;
pub use self::dispatcher::{API_HANDLER_FIELD, API_MISMATCH, Dispatcher, OWNER_HANDLER_FIELD};
pub use self::errors::{CommandError, DispatchError, ParamError, ParamReason};
pub use self::outcome::{Outcome, OutcomeBuilder, RpcError, StatusCode};
pub use self::params::{PORT_ID_FIELD, ParamArray, Params, UnsignedBound};
pub use self::registry::{
    CommandEntry, CommandHandler, CommandPolicy, CommandRegistry, RegistryError,
};
pub use self::request::RpcRequest;
pub use self::response::{REQUEST_FIELD, ResponseWriter, RpcResponse};
pub use self::value::{ValueKind, empty_object};
