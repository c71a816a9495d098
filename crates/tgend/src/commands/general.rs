//! Server identity, introspection and shutdown.

use serde_json::{Value, json};
use tracing::info;

use crate::process::PROCESS_TARGET;
use crate::rpc::{CommandContext, CommandError, OutcomeBuilder, Params, empty_object};

use super::record_port_error;

/// Liveness probe.
pub(super) fn ping(
    _context: &CommandContext<'_>,
    _params: &Params<'_>,
    outcome: &mut OutcomeBuilder,
) -> Result<(), CommandError> {
    outcome.set_result(empty_object());
    Ok(())
}

/// Lists every registered command name in lexicographic order.
pub(super) fn get_cmds(
    context: &CommandContext<'_>,
    _params: &Params<'_>,
    outcome: &mut OutcomeBuilder,
) -> Result<(), CommandError> {
    let names: Vec<Value> = context
        .registry()
        .names()
        .map(|name| Value::String(name.to_owned()))
        .collect();
    outcome.set_result(Value::Array(names));
    Ok(())
}

pub(super) fn get_version(
    _context: &CommandContext<'_>,
    _params: &Params<'_>,
    outcome: &mut OutcomeBuilder,
) -> Result<(), CommandError> {
    outcome.set_result(json!({
        "version": concat!("v", env!("CARGO_PKG_VERSION")),
        "build_date": env!("TGEN_BUILD_DATE"),
        "build_time": env!("TGEN_BUILD_TIME"),
        "built_by": env!("TGEN_BUILT_BY"),
    }));
    Ok(())
}

/// Asks the platform to stop once no other client owns a port.
///
/// Every port is checked so the client learns about all conflicts at once.
/// A single conflict without `force` leaves the platform running.
pub(super) fn shutdown(
    context: &CommandContext<'_>,
    params: &Params<'_>,
    outcome: &mut OutcomeBuilder,
) -> Result<(), CommandError> {
    let user = params.non_empty_string("user")?;
    let force = params.bool("force")?;

    for port in context.state().ports().iter() {
        let owner = match port.owner() {
            Ok(owner) => owner,
            Err(error) => {
                record_port_error(outcome, error)?;
                continue;
            }
        };
        if owner.is_free() || owner.is_owned_by(user) || force {
            continue;
        }
        outcome.report_execution_error(format!(
            "port {} is owned by '{}' - specify 'force' for override",
            port.id(),
            owner.name()
        ));
    }

    if outcome.has_errors() {
        return Ok(());
    }

    info!(target: PROCESS_TARGET, user, force, "shutdown requested by client");
    context.state().platform().mark_for_shutdown();
    outcome.set_result(empty_object());
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use crate::platform::PlatformApi;
    use crate::rpc::StatusCode;
    use crate::tests::support::{TestServer, test_server};

    #[rstest]
    fn ping_returns_empty_object(test_server: TestServer) {
        let outcome = test_server.execute("ping", json!({}));
        assert_eq!(outcome.status, StatusCode::Ok);
        assert_eq!(outcome.result, json!({}));
    }

    #[rstest]
    fn get_cmds_lists_each_command_once(test_server: TestServer) {
        let outcome = test_server.execute("get_cmds", json!({}));
        let names: Vec<&str> = outcome
            .result
            .as_array()
            .expect("array")
            .iter()
            .filter_map(|name| name.as_str())
            .collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(names, sorted);
        assert!(names.contains(&"sync"));
        assert!(names.contains(&"get_cmds"));
    }

    #[rstest]
    fn get_version_reports_build_facts(test_server: TestServer) {
        let outcome = test_server.execute("get_version", json!({}));
        let version = outcome.result["version"].as_str().expect("version");
        assert!(version.starts_with('v'));
        for key in ["build_date", "build_time", "built_by"] {
            assert!(outcome.result[key].is_string(), "{key} should be a string");
        }
    }

    #[rstest]
    fn shutdown_marks_platform_when_ports_are_free(test_server: TestServer) {
        let api_h = test_server.api_handler();
        let outcome = test_server.execute(
            "shutdown",
            json!({"api_h": api_h, "user": "alice", "force": false}),
        );
        assert_eq!(outcome.status, StatusCode::Ok);
        assert!(test_server.platform().is_marked_for_shutdown());
    }

    #[rstest]
    fn shutdown_reports_every_foreign_owner(test_server: TestServer) {
        test_server.acquire(0, "bob");
        test_server.acquire(1, "alice");
        test_server.acquire(3, "carol");
        let api_h = test_server.api_handler();

        let outcome = test_server.execute(
            "shutdown",
            json!({"api_h": api_h, "user": "alice", "force": false}),
        );

        assert_eq!(outcome.status, StatusCode::ExecuteError);
        let messages: Vec<_> = outcome.errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "port 0 is owned by 'bob' - specify 'force' for override",
                "port 3 is owned by 'carol' - specify 'force' for override",
            ]
        );
        assert!(!test_server.platform().is_marked_for_shutdown());
    }

    #[rstest]
    fn forced_shutdown_ignores_owners(test_server: TestServer) {
        test_server.acquire(0, "bob");
        let api_h = test_server.api_handler();
        let outcome = test_server.execute(
            "shutdown",
            json!({"api_h": api_h, "user": "alice", "force": true}),
        );
        assert_eq!(outcome.status, StatusCode::Ok);
        assert!(test_server.platform().is_marked_for_shutdown());
    }

    #[rstest]
    #[case(json!({"force": true}))]
    #[case(json!({"user": "", "force": true}))]
    fn shutdown_requires_user(test_server: TestServer, #[case] mut params: serde_json::Value) {
        params["api_h"] = json!(test_server.api_handler());
        let outcome = test_server.execute("shutdown", params);
        assert_eq!(outcome.status, StatusCode::ParamError);
        assert_eq!(outcome.errors[0].field.as_deref(), Some("user"));
        assert!(!test_server.platform().is_marked_for_shutdown());
    }
}
