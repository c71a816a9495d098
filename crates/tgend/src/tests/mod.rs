//! Test suites for the traffic generator daemon.

pub(crate) mod support;
