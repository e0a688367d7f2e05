//! The dispatch loop shared by both bridges.
//!
//! One loop, parameterized by a [`BridgeService`] pairing the request
//! validator with the model capability. Processing is strictly sequential:
//! the next line is not read until the current invocation returned, so
//! responses always come back in request order, one line per request.
//!
//! The loop is generic over the input/output streams; the binaries hand it
//! locked stdio, tests hand it in-memory buffers.

use std::io::{self, BufRead, Write};

use crate::error::EngineError;
use crate::protocol::{self, RawRequest, Response};

/// The validator + model capability pair a bridge binary plugs into the
/// loop.
pub trait BridgeService {
    /// A validated request, ready for dispatch.
    type Command;

    /// Map a decoded request to a typed command or reject it with an error
    /// response. Must not touch the model; pure apart from filesystem
    /// existence checks.
    fn validate(&self, request: &RawRequest, request_id: &str)
        -> Result<Self::Command, Response>;

    /// Run one validated command against the loaded model. Blocking; no
    /// further input is read until it returns.
    fn invoke(&mut self, request_id: &str, command: Self::Command)
        -> Result<Response, EngineError>;
}

/// Serve until shutdown or end of input.
///
/// Emits `ready` first, then writes exactly one response line per non-empty
/// input line. Empty lines are skipped silently. A `shutdown` line stops
/// reading without a response of its own; end of input drains the same way.
/// Read errors are logged and treated as end of input; write errors
/// propagate, since a response that cannot be delivered breaks the
/// one-line-in-one-line-out contract.
pub fn run<S, R, W>(service: &mut S, mut reader: R, writer: &mut W) -> io::Result<()>
where
    S: BridgeService,
    R: BufRead,
    W: Write,
{
    write_line(writer, &Response::Ready)?;
    log::info!("Listening for requests...");

    // Counts dispatched requests; also the source of synthesized ids for
    // requests that carry none.
    let mut served: u64 = 0;

    let mut line = String::new();
    loop {
        line.clear();
        let bytes = match reader.read_line(&mut line) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::error!("Failed to read input: {}", err);
                break;
            }
        };
        if bytes == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match protocol::decode(trimmed) {
            Ok(request) => {
                if request.kind() == Some("shutdown") {
                    log::info!("Shutdown requested.");
                    break;
                }
                let response = dispatch(service, &request, served);
                served += 1;
                response
            }
            Err(err) => Response::framing_error(&err),
        };
        write_line(writer, &response)?;
    }

    Ok(())
}

/// Report a fatal startup failure on the protocol channel and exit
/// non-zero.
///
/// Runs before the loop, so `ready` was never emitted; the parent sees the
/// error line instead and knows the process is not coming up. Write
/// failures are ignored here, the exit status carries the verdict.
pub fn init_failure(message: String) -> ! {
    let response = Response::Error {
        id: Some("init".to_string()),
        code: protocol::ErrorCode::EngineError,
        message,
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let _ = out.write_all(protocol::encode(&response).as_bytes());
    let _ = out.write_all(b"\n");
    let _ = out.flush();
    std::process::exit(1);
}

fn dispatch<S: BridgeService>(service: &mut S, request: &RawRequest, served: u64) -> Response {
    let request_id = match request.id() {
        Some(id) => id.to_string(),
        None => format!("req_{}", served),
    };

    match service.validate(request, &request_id) {
        Ok(command) => match service.invoke(&request_id, command) {
            Ok(response) => response,
            Err(err) => Response::Error {
                id: Some(request_id),
                code: err.code(),
                message: err.message().to_string(),
            },
        },
        Err(response) => response,
    }
}

fn write_line<W: Write>(writer: &mut W, response: &Response) -> io::Result<()> {
    writer.write_all(protocol::encode(response).as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ErrorCode;
    use serde::Deserialize;
    use serde_json::Value;
    use std::io::Cursor;

    /// Echoes payloads back; payloads `boom` and `oom` simulate engine
    /// failures so the loop's classification path can be exercised without
    /// a model.
    struct EchoService;

    #[derive(Deserialize)]
    struct EchoFields {
        #[serde(default)]
        payload: String,
    }

    impl BridgeService for EchoService {
        type Command = String;

        fn validate(&self, request: &RawRequest, request_id: &str) -> Result<String, Response> {
            match request.kind() {
                Some("echo") => {
                    let fields: EchoFields = match request.fields() {
                        Ok(fields) => fields,
                        Err(err) => {
                            return Err(Response::Error {
                                id: Some(request_id.to_string()),
                                code: ErrorCode::InvalidRequest,
                                message: format!("Invalid echo request: {}", err),
                            })
                        }
                    };
                    if fields.payload.is_empty() {
                        return Err(Response::Error {
                            id: Some(request_id.to_string()),
                            code: ErrorCode::InvalidText,
                            message: "Payload is empty".to_string(),
                        });
                    }
                    Ok(fields.payload)
                }
                _ => Err(Response::unknown_type(request, request_id)),
            }
        }

        fn invoke(&mut self, request_id: &str, payload: String) -> Result<Response, EngineError> {
            match payload.as_str() {
                "boom" => Err(EngineError::classify("mock engine failure")),
                "oom" => Err(EngineError::classify("CUDA out of memory")),
                _ => Ok(Response::Caption {
                    id: request_id.to_string(),
                    caption: format!("echo:{}", payload),
                }),
            }
        }
    }

    fn serve(input: &str) -> Vec<String> {
        let mut service = EchoService;
        let mut output = Vec::new();
        run(&mut service, Cursor::new(input.to_string()), &mut output).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn parse(line: &str) -> Value {
        serde_json::from_str(line).unwrap()
    }

    #[test]
    fn ready_is_the_exact_first_line() {
        let lines = serve("");
        assert_eq!(lines, vec![r#"{"type":"ready"}"#.to_string()]);
    }

    #[test]
    fn one_response_per_request_in_order() {
        let lines = serve(concat!(
            r#"{"type":"echo","id":"r1","payload":"a"}"#, "\n",
            r#"{"type":"echo","id":"r2","payload":"b"}"#, "\n",
            r#"{"type":"echo","id":"r3","payload":"c"}"#, "\n",
        ));
        assert_eq!(lines.len(), 4);
        for (line, (id, payload)) in lines[1..].iter().zip([("r1", "a"), ("r2", "b"), ("r3", "c")]) {
            let value = parse(line);
            assert_eq!(value["id"], id);
            assert_eq!(value["caption"], format!("echo:{}", payload));
        }
    }

    #[test]
    fn empty_and_whitespace_lines_are_skipped() {
        let lines = serve("\n   \n\t\n{\"type\":\"echo\",\"id\":\"r1\",\"payload\":\"a\"}\n\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(parse(&lines[1])["id"], "r1");
    }

    #[test]
    fn malformed_line_reports_framing_error_and_continues() {
        let lines = serve(concat!(
            r#"{"type":"#, "\n",
            r#"{"type":"echo","id":"r2","payload":"ok"}"#, "\n",
        ));
        assert_eq!(lines.len(), 3);

        let error = parse(&lines[1]);
        assert_eq!(error["type"], "error");
        assert_eq!(error["code"], "INVALID_REQUEST");
        assert!(error["message"].as_str().unwrap().starts_with("Invalid JSON: "));
        assert!(error.get("id").is_none());

        assert_eq!(parse(&lines[2])["id"], "r2");
    }

    #[test]
    fn shutdown_gets_no_response_and_stops_reading() {
        let lines = serve(concat!(
            r#"{"type":"echo","id":"r1","payload":"a"}"#, "\n",
            r#"{"type":"shutdown"}"#, "\n",
            r#"{"type":"echo","id":"r2","payload":"b"}"#, "\n",
        ));
        assert_eq!(lines.len(), 2);
        assert_eq!(parse(&lines[1])["id"], "r1");
    }

    #[test]
    fn unknown_type_is_reported_with_request_id() {
        let lines = serve("{\"type\":\"transcribe\",\"id\":\"r9\"}\n");
        let error = parse(&lines[1]);
        assert_eq!(error["code"], "INVALID_REQUEST");
        assert_eq!(error["id"], "r9");
        assert_eq!(error["message"], "Unknown request type: transcribe");
    }

    #[test]
    fn missing_type_is_reported_as_null() {
        let lines = serve("{\"id\":\"r8\"}\n");
        let error = parse(&lines[1]);
        assert_eq!(error["message"], "Unknown request type: null");
        assert_eq!(error["id"], "r8");
    }

    #[test]
    fn validation_error_echoes_request_id() {
        let lines = serve("{\"type\":\"echo\",\"id\":\"r1\",\"payload\":\"\"}\n");
        let error = parse(&lines[1]);
        assert_eq!(error["code"], "INVALID_TEXT");
        assert_eq!(error["id"], "r1");
        assert_eq!(error["message"], "Payload is empty");
    }

    #[test]
    fn engine_failures_are_classified() {
        let lines = serve(concat!(
            r#"{"type":"echo","id":"r1","payload":"boom"}"#, "\n",
            r#"{"type":"echo","id":"r2","payload":"oom"}"#, "\n",
        ));

        let error = parse(&lines[1]);
        assert_eq!(error["code"], "ENGINE_ERROR");
        assert_eq!(error["id"], "r1");
        assert_eq!(error["message"], "mock engine failure");

        let error = parse(&lines[2]);
        assert_eq!(error["code"], "OUT_OF_MEMORY");
        assert_eq!(error["id"], "r2");
    }

    #[test]
    fn requests_without_id_get_synthesized_ids() {
        let lines = serve(concat!(
            r#"{"type":"echo","payload":"a"}"#, "\n",
            r#"{"type":"echo","payload":"b"}"#, "\n",
        ));
        assert_eq!(parse(&lines[1])["id"], "req_0");
        assert_eq!(parse(&lines[2])["id"], "req_1");
    }

    #[test]
    fn non_string_ids_are_replaced_with_synthesized_ids() {
        let lines = serve("{\"type\":\"echo\",\"id\":7,\"payload\":\"a\"}\n");
        assert_eq!(parse(&lines[1])["id"], "req_0");
    }
}
