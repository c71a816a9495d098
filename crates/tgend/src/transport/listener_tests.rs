//! Tests for the socket listener.

use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rstest::{fixture, rstest};

use tgen_config::SocketEndpoint;

use super::listener::SocketListener;
use super::{ConnectionHandler, CountingHandler, ListenerError, wait_until};

struct CountingFixture {
    count: Arc<AtomicUsize>,
    handler: Arc<dyn ConnectionHandler>,
}

#[fixture]
fn counting_fixture() -> CountingFixture {
    let (count, handler) = CountingHandler::new();
    CountingFixture { count, handler }
}

#[fixture]
fn tcp_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", 0)
}

fn tcp_port(endpoint: &SocketEndpoint) -> u16 {
    match endpoint {
        SocketEndpoint::Tcp { port, .. } => *port,
        SocketEndpoint::Unix { .. } => panic!("expected a TCP endpoint"),
    }
}

#[rstest]
fn tcp_listener_reports_assigned_port(tcp_endpoint: SocketEndpoint) {
    let listener = SocketListener::bind(&tcp_endpoint).expect("bind tcp listener");
    assert_ne!(tcp_port(listener.endpoint()), 0);
}

#[rstest]
fn tcp_listener_tracks_active_connections(
    tcp_endpoint: SocketEndpoint,
    counting_fixture: CountingFixture,
) {
    let listener = SocketListener::bind(&tcp_endpoint).expect("bind tcp listener");
    let port = tcp_port(listener.endpoint());
    let CountingFixture { count, handler } = counting_fixture;
    let handle = listener.start(handler).expect("start listener");

    let first = TcpStream::connect(("127.0.0.1", port)).expect("connect first client");
    let second = TcpStream::connect(("127.0.0.1", port)).expect("connect second client");

    assert!(
        wait_until(|| count.load(Ordering::SeqCst) >= 2),
        "expected two connections"
    );
    assert!(wait_until(|| handle.active_connections() == 2));

    drop(first);
    drop(second);
    assert!(
        wait_until(|| handle.active_connections() == 0),
        "workers should exit once clients hang up"
    );

    handle.shutdown();
    handle.join().expect("join listener");
}

#[cfg(unix)]
#[fixture]
fn unix_tempdir() -> tempfile::TempDir {
    tempfile::tempdir().expect("temp dir")
}

#[cfg(unix)]
#[rstest]
fn unix_listener_cleans_stale_socket_files(
    unix_tempdir: tempfile::TempDir,
    counting_fixture: CountingFixture,
) {
    let path = unix_tempdir.path().join("tgend.sock");
    {
        let _stale = std::os::unix::net::UnixListener::bind(&path).expect("bind stale listener");
    }
    assert!(path.exists(), "stale socket should remain");

    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
    let listener = SocketListener::bind(&endpoint).expect("bind new listener");
    let handle = listener.start(counting_fixture.handler).expect("start listener");

    let client = std::os::unix::net::UnixStream::connect(&path).expect("connect unix client");
    assert!(wait_until(|| counting_fixture.count.load(Ordering::SeqCst) == 1));
    drop(client);

    handle.shutdown();
    handle.join().expect("join listener");
    assert!(
        !path.exists(),
        "listener should remove unix socket on shutdown"
    );
}

#[cfg(unix)]
#[rstest]
fn unix_listener_rejects_in_use_socket(unix_tempdir: tempfile::TempDir) {
    let path = unix_tempdir.path().join("tgend.sock");
    let _existing = std::os::unix::net::UnixListener::bind(&path).expect("bind existing listener");

    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
    let error = SocketListener::bind(&endpoint).expect_err("should fail bind");
    assert!(matches!(error, ListenerError::UnixInUse { .. }));
}

#[cfg(unix)]
#[rstest]
fn unix_listener_refuses_to_replace_regular_file(unix_tempdir: tempfile::TempDir) {
    let path = unix_tempdir.path().join("tgend.sock");
    std::fs::write(&path, b"not a socket").expect("write file");

    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
    let error = SocketListener::bind(&endpoint).expect_err("should fail bind");
    assert!(matches!(error, ListenerError::UnixNotSocket { .. }));
    assert!(path.exists());
}
