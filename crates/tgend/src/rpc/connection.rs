//! Connection handler that serves JSONL requests.
//!
//! A connection carries any number of request lines. Each line is answered
//! with exactly one response line, in order. A line that cannot be parsed is
//! answered with a `PARAM_ERROR` rejection and the connection keeps going; an
//! oversized line or an I/O failure closes it.

use std::io::{self, BufRead, BufReader};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::transport::{ConnectionHandler, ConnectionStream};

use super::dispatcher::{DISPATCH_TARGET, Dispatcher};
use super::errors::DispatchError;
use super::request::RpcRequest;
use super::response::{ResponseWriter, RpcResponse};

/// Maximum size of a single request line in bytes.
pub(crate) const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Serves RPC requests over accepted connections.
#[derive(Debug, Clone)]
pub struct RpcConnectionHandler {
    dispatcher: Arc<Dispatcher>,
}

impl RpcConnectionHandler {
    /// Creates a handler that executes requests with `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Produces the response for one request line.
    pub fn respond(&self, line: &[u8]) -> RpcResponse {
        match RpcRequest::parse(line) {
            Ok(request) => {
                let outcome = self.dispatcher.execute(request.command(), &request.params);
                RpcResponse::from_outcome(request.id, outcome)
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "malformed request");
                RpcResponse::rejected(&error)
            }
        }
    }

    fn serve(&self, stream: ConnectionStream) {
        let output = match stream.try_clone() {
            Ok(output) => output,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "failed to split connection");
                return;
            }
        };
        let mut reader = BufReader::new(stream);
        let mut writer = ResponseWriter::new(output);

        loop {
            let line = match read_request_line(&mut reader) {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!(target: DISPATCH_TARGET, "client closed connection");
                    return;
                }
                Err(error) => {
                    warn!(target: DISPATCH_TARGET, %error, "failed to read request");
                    if !matches!(error, DispatchError::Io(_)) {
                        let _ = writer.write_rejection(&error);
                    }
                    return;
                }
            };

            let response = self.respond(&line);
            if let Err(error) = writer.write_response(&response) {
                warn!(target: DISPATCH_TARGET, %error, "failed to write response");
                return;
            }
        }
    }
}

impl ConnectionHandler for RpcConnectionHandler {
    fn handle(&self, stream: ConnectionStream) {
        self.serve(stream);
    }
}

/// Reads one bounded JSONL line, including its newline delimiter.
///
/// Returns `Ok(None)` once the client disconnects between requests. A final
/// line without a trailing newline is still returned.
fn read_request_line<R: BufRead>(reader: &mut R) -> Result<Option<Vec<u8>>, DispatchError> {
    let mut line = Vec::new();
    loop {
        let available = match reader.fill_buf() {
            Ok(available) => available,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error.into()),
        };

        if available.is_empty() {
            return Ok((!line.is_empty()).then_some(line));
        }

        let (taken, complete) = match available.iter().position(|byte| *byte == b'\n') {
            Some(newline) => (newline + 1, true),
            None => (available.len(), false),
        };
        line.extend_from_slice(available.get(..taken).unwrap_or_default());
        reader.consume(taken);
        enforce_limit(line.len())?;

        if complete {
            return Ok(Some(line));
        }
    }
}

fn enforce_limit(size: usize) -> Result<(), DispatchError> {
    if size > MAX_REQUEST_BYTES {
        return Err(DispatchError::request_too_large(size, MAX_REQUEST_BYTES));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Cursor, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};

    use rstest::{fixture, rstest};
    use serde_json::{Value, json};

    use super::*;
    use crate::commands::build_registry;
    use crate::tests::support::emulated_state;

    #[rstest]
    #[case(b"{\"command\":\"ping\"}\n".as_slice(), Some(b"{\"command\":\"ping\"}\n".as_slice()))]
    #[case(b"tail-without-newline".as_slice(), Some(b"tail-without-newline".as_slice()))]
    #[case(b"".as_slice(), None)]
    fn reads_single_lines(#[case] input: &[u8], #[case] expected: Option<&[u8]>) {
        let mut reader = Cursor::new(input);
        let line = read_request_line(&mut reader).expect("read");
        assert_eq!(line.as_deref(), expected);
    }

    #[test]
    fn reads_consecutive_lines_without_losing_bytes() {
        let mut reader = BufReader::with_capacity(4, Cursor::new(b"one\ntwo\nthree".as_slice()));
        let mut lines = Vec::new();
        while let Some(line) = read_request_line(&mut reader).expect("read") {
            lines.push(String::from_utf8(line).expect("utf8"));
        }
        assert_eq!(lines, ["one\n", "two\n", "three"]);
    }

    #[test]
    fn rejects_oversized_lines() {
        let oversized = vec![b'x'; MAX_REQUEST_BYTES + 1];
        let mut reader = Cursor::new(oversized);
        let error = read_request_line(&mut reader).expect_err("too large");
        assert!(matches!(error, DispatchError::RequestTooLarge { .. }));
    }

    /// TCP server/client pair serving a single connection.
    struct HandlerTestHarness {
        client: TcpStream,
        reader: BufReader<TcpStream>,
        server_handle: JoinHandle<()>,
    }

    impl HandlerTestHarness {
        fn send(&mut self, request: &[u8]) -> Value {
            self.client.write_all(request).expect("write request");
            self.client.flush().expect("flush");
            let mut line = String::new();
            self.reader.read_line(&mut line).expect("read response");
            serde_json::from_str(&line).expect("response is json")
        }

        fn close(self) {
            drop(self.client);
            drop(self.reader);
            self.server_handle.join().expect("server join");
        }
    }

    #[fixture]
    fn harness() -> HandlerTestHarness {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let addr = listener.local_addr().expect("addr");
        let registry = build_registry().expect("registry");
        let dispatcher = Arc::new(Dispatcher::new(registry, emulated_state()));
        let handler = RpcConnectionHandler::new(dispatcher);

        let server_handle = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            handler.handle(ConnectionStream::Tcp(stream));
        });

        let client = TcpStream::connect(addr).expect("connect");
        let reader = BufReader::new(client.try_clone().expect("clone client"));
        HandlerTestHarness {
            client,
            reader,
            server_handle,
        }
    }

    #[rstest]
    fn serves_many_requests_per_connection(mut harness: HandlerTestHarness) {
        let first = harness.send(b"{\"id\":1,\"command\":\"ping\"}\n");
        assert_eq!(first, json!({"id": 1, "status": "OK", "result": {}}));

        let second = harness.send(b"{\"id\":2,\"command\":\"get_owner\",\"params\":{\"port_id\":0}}\n");
        assert_eq!(second["id"], 2);
        assert_eq!(second["result"], json!({"owner": ""}));

        harness.close();
    }

    #[rstest]
    fn malformed_line_keeps_connection_open(mut harness: HandlerTestHarness) {
        let rejected = harness.send(b"not valid json\n");
        assert_eq!(rejected["status"], "PARAM_ERROR");
        assert_eq!(rejected["errors"][0]["field"], "request");

        let accepted = harness.send(b"{\"command\":\"ping\"}\n");
        assert_eq!(accepted["status"], "OK");

        harness.close();
    }

    #[rstest]
    fn unknown_command_is_reported(mut harness: HandlerTestHarness) {
        let response = harness.send(b"{\"id\":\"x\",\"command\":\"bogus\"}\n");
        assert_eq!(response["id"], "x");
        assert_eq!(response["status"], "UNKNOWN_COMMAND");

        harness.close();
    }
}
