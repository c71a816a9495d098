//! Facts about the machine the daemon runs on.

use std::fs;
use std::path::Path;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Reported when a host fact cannot be determined.
pub const UNKNOWN: &str = "unknown";

const CPU_MODEL_PREFIX: &str = "model name";

/// Host identity captured once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    hostname: String,
    cpu_model: String,
    started_at: OffsetDateTime,
}

impl HostInfo {
    /// Captures the host's identity.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            hostname: detect_hostname(),
            cpu_model: fs::read_to_string(Path::new("/proc/cpuinfo"))
                .ok()
                .and_then(|contents| parse_cpu_model(&contents))
                .unwrap_or_else(|| UNKNOWN.to_owned()),
            started_at: OffsetDateTime::now_utc(),
        }
    }

    /// Host identity with explicit values.
    pub fn new(
        hostname: impl Into<String>,
        cpu_model: impl Into<String>,
        started_at: OffsetDateTime,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            cpu_model: cpu_model.into(),
            started_at,
        }
    }

    /// Host name.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// CPU model string.
    #[must_use]
    pub fn cpu_model(&self) -> &str {
        &self.cpu_model
    }

    /// Server start time as RFC 3339.
    #[must_use]
    pub fn uptime(&self) -> String {
        self.started_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| UNKNOWN.to_owned())
    }
}

#[cfg(unix)]
fn detect_hostname() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| UNKNOWN.to_owned())
}

#[cfg(not(unix))]
fn detect_hostname() -> String {
    UNKNOWN.to_owned()
}

/// Extracts the first `model name` value from `/proc/cpuinfo` contents.
fn parse_cpu_model(contents: &str) -> Option<String> {
    contents
        .lines()
        .find_map(|line| line.strip_prefix(CPU_MODEL_PREFIX))
        .map(|rest| rest.trim_start_matches([' ', '\t', ':']).trim_end().to_owned())
        .filter(|model| !model.is_empty())
}
