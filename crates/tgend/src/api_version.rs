//! API compatibility table.
//!
//! Every API class the daemon serves has a version and a handler token that
//! is generated once at startup. A client proves it negotiated a compatible
//! version by echoing the token as `api_h` on privileged commands.

use std::collections::BTreeMap;

use strum::{Display, EnumString, IntoStaticStr, VariantNames};
use thiserror::Error;

use crate::ports::generate_handler;

/// Interface classes a client can negotiate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, EnumString, IntoStaticStr,
    VariantNames,
)]
#[strum(serialize_all = "snake_case")]
pub enum ApiClass {
    /// Core command set.
    Core,
}

/// Version of an API class as `(major, minor)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiVersion {
    /// Breaking revision.
    pub major: i64,
    /// Additive revision.
    pub minor: i64,
}

impl ApiVersion {
    /// Version of the core command set served by this build.
    pub const CORE: Self = Self { major: 2, minor: 1 };

    /// Whether a client asking for `requested` can be served.
    ///
    /// Majors must match and the server must provide at least the requested
    /// minor revision.
    #[must_use]
    pub fn serves(self, requested: Self) -> bool {
        self.major == requested.major && requested.minor <= self.minor
    }
}

/// A requested version could not be served.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiVersionError {
    /// The requested version is incompatible.
    #[error(
        "{class} API version mismatch: server v{}.{}, client v{}.{}",
        .server.major, .server.minor, .requested.major, .requested.minor
    )]
    Mismatch {
        /// Class that was negotiated.
        class: ApiClass,
        /// Version served.
        server: ApiVersion,
        /// Version asked for.
        requested: ApiVersion,
    },
    /// The class is not served at all.
    #[error("{class} API is not supported")]
    Unsupported {
        /// Class that was negotiated.
        class: ApiClass,
    },
}

#[derive(Debug, Clone)]
struct ApiEntry {
    version: ApiVersion,
    handler: String,
}

/// Versions and handler tokens for every served API class.
#[derive(Debug, Clone)]
pub struct ApiVersionTable {
    entries: BTreeMap<ApiClass, ApiEntry>,
}

impl Default for ApiVersionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiVersionTable {
    /// Table serving the versions of this build with fresh handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::with_versions([(ApiClass::Core, ApiVersion::CORE)])
    }

    /// Table serving the given versions with fresh handlers.
    pub fn with_versions(versions: impl IntoIterator<Item = (ApiClass, ApiVersion)>) -> Self {
        let entries = versions
            .into_iter()
            .map(|(class, version)| {
                (
                    class,
                    ApiEntry {
                        version,
                        handler: generate_handler(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Version served for `class`.
    #[must_use]
    pub fn version(&self, class: ApiClass) -> Option<ApiVersion> {
        self.entries.get(&class).map(|entry| entry.version)
    }

    /// Returns the handler for `class` when `(major, minor)` is servable.
    ///
    /// # Errors
    ///
    /// Returns [`ApiVersionError`] when the class is not served or the
    /// version is incompatible.
    pub fn verify(&self, class: ApiClass, major: i64, minor: i64) -> Result<&str, ApiVersionError> {
        let entry = self
            .entries
            .get(&class)
            .ok_or(ApiVersionError::Unsupported { class })?;
        let requested = ApiVersion { major, minor };
        if entry.version.serves(requested) {
            Ok(&entry.handler)
        } else {
            Err(ApiVersionError::Mismatch {
                class,
                server: entry.version,
                requested,
            })
        }
    }

    /// Whether `handler` was issued for any served class.
    #[must_use]
    pub fn is_valid_handler(&self, handler: &str) -> bool {
        self.entries.values().any(|entry| entry.handler == handler)
    }
}
