//! Line codec and wire types.
//!
//! Framing unit is one JSON object per line. Decoding only checks framing;
//! whether the object makes sense as a request is the validator's job, so a
//! `generate` without `text` decodes fine here and is rejected later with
//! the right error code.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Closed error taxonomy shared by both bridges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidRequest,
    InvalidText,
    VoiceNotFound,
    ImageNotFound,
    OutOfMemory,
    EngineError,
}

/// An input line that could not be parsed as a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid JSON: {0}")]
pub struct FramingError(String);

/// A decoded request line: the raw JSON object plus accessors for the
/// discriminator and id.
#[derive(Debug, Clone)]
pub struct RawRequest {
    body: Map<String, Value>,
}

impl RawRequest {
    /// The `type` discriminator, when present as a string.
    pub fn kind(&self) -> Option<&str> {
        self.body.get("type").and_then(Value::as_str)
    }

    /// Rendering of the discriminator for error messages: the string itself,
    /// the JSON form of a non-string value, `null` when the field is absent.
    pub fn kind_label(&self) -> String {
        match self.body.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            Some(other) => other.to_string(),
            None => Value::Null.to_string(),
        }
    }

    /// Caller-supplied request id. A non-string id is treated as absent and
    /// the dispatch loop synthesizes one instead.
    pub fn id(&self) -> Option<&str> {
        self.body.get("id").and_then(Value::as_str)
    }

    /// Deserialize the body into a typed field struct. Unknown keys are
    /// ignored, recognized-but-mistyped fields are an error.
    pub fn fields<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.body.clone()))
    }
}

/// Parse one input line into a request, or a framing error carrying the
/// parse diagnostic. A non-object top level (`42`, `"hi"`, `[]`) is a
/// framing error too.
pub fn decode(line: &str) -> Result<RawRequest, FramingError> {
    let body: Map<String, Value> =
        serde_json::from_str(line).map_err(|err| FramingError(err.to_string()))?;
    Ok(RawRequest { body })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Emitted exactly once, before any request is processed.
    #[serde(rename = "ready")]
    Ready,
    #[serde(rename = "audio")]
    Audio {
        id: String,
        path: String,
        /// Seconds, rounded to millisecond precision.
        duration: f64,
    },
    #[serde(rename = "caption")]
    Caption { id: String, caption: String },
    /// Best-effort progress notification; never guaranteed per request.
    #[serde(rename = "progress")]
    Progress { percent: u8, message: String },
    #[serde(rename = "error")]
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        code: ErrorCode,
        message: String,
    },
}

impl Response {
    /// Error line for an unparseable input line. No id: none was
    /// recoverable from the line.
    pub fn framing_error(err: &FramingError) -> Self {
        Response::Error {
            id: None,
            code: ErrorCode::InvalidRequest,
            message: err.to_string(),
        }
    }

    /// Error for an unrecognized or missing discriminator.
    pub fn unknown_type(request: &RawRequest, request_id: &str) -> Self {
        Response::Error {
            id: Some(request_id.to_string()),
            code: ErrorCode::InvalidRequest,
            message: format!("Unknown request type: {}", request.kind_label()),
        }
    }
}

/// Serialize a response to its single-line wire form. Encoding is total: a
/// serializer failure (not reachable for these shapes) degrades to a
/// hand-built error line instead of a panic mid-protocol.
pub fn encode(response: &Response) -> String {
    serde_json::to_string(response).unwrap_or_else(|err| {
        log::error!("Failed to encode response: {}", err);
        r#"{"type":"error","code":"ENGINE_ERROR","message":"failed to encode response"}"#
            .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_decode_object() {
        let request = decode(r#"{"type":"generate","id":"req_001","text":"Hello"}"#).unwrap();
        assert_eq!(request.kind(), Some("generate"));
        assert_eq!(request.id(), Some("req_001"));
    }

    #[test]
    fn test_decode_malformed_line() {
        let err = decode(r#"{"type":"#).unwrap_err();
        assert!(err.to_string().starts_with("Invalid JSON: "));
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert!(decode("42").is_err());
        assert!(decode(r#""generate""#).is_err());
        assert!(decode("[1,2]").is_err());
    }

    #[test]
    fn test_kind_label_renderings() {
        let request = decode(r#"{"type":"caption"}"#).unwrap();
        assert_eq!(request.kind_label(), "caption");

        let request = decode(r#"{"type":42}"#).unwrap();
        assert_eq!(request.kind(), None);
        assert_eq!(request.kind_label(), "42");

        let request = decode(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(request.kind_label(), "null");
    }

    #[test]
    fn test_non_string_id_treated_as_absent() {
        let request = decode(r#"{"type":"generate","id":7}"#).unwrap();
        assert_eq!(request.id(), None);
    }

    #[test]
    fn test_fields_ignores_unknown_keys() {
        #[derive(Deserialize)]
        struct Fields {
            text: String,
        }

        let request = decode(r#"{"type":"generate","text":"hi","zzz":true}"#).unwrap();
        let fields: Fields = request.fields().unwrap();
        assert_eq!(fields.text, "hi");
    }

    #[test]
    fn test_ready_wire_form() {
        assert_eq!(encode(&Response::Ready), r#"{"type":"ready"}"#);
    }

    #[test]
    fn test_audio_wire_form() {
        let line = encode(&Response::Audio {
            id: "req_001".to_string(),
            path: "/tmp/out.wav".to_string(),
            duration: 1.5,
        });
        assert_eq!(
            line,
            r#"{"type":"audio","id":"req_001","path":"/tmp/out.wav","duration":1.5}"#
        );
    }

    #[test]
    fn test_caption_and_progress_wire_forms() {
        let line = encode(&Response::Caption {
            id: "r2".to_string(),
            caption: "First image, on the page".to_string(),
        });
        assert_eq!(
            line,
            r#"{"type":"caption","id":"r2","caption":"First image, on the page"}"#
        );

        let line = encode(&Response::Progress {
            percent: 45,
            message: "Generating...".to_string(),
        });
        assert_eq!(line, r#"{"type":"progress","percent":45,"message":"Generating..."}"#);
    }

    #[test]
    fn test_error_wire_form_with_and_without_id() {
        let line = encode(&Response::Error {
            id: Some("r1".to_string()),
            code: ErrorCode::InvalidText,
            message: "Text is empty".to_string(),
        });
        assert_eq!(
            line,
            r#"{"type":"error","id":"r1","code":"INVALID_TEXT","message":"Text is empty"}"#
        );

        let line = encode(&Response::Error {
            id: None,
            code: ErrorCode::InvalidRequest,
            message: "Unknown request type: null".to_string(),
        });
        assert_eq!(
            line,
            r#"{"type":"error","code":"INVALID_REQUEST","message":"Unknown request type: null"}"#
        );
    }

    #[test]
    fn test_error_code_wire_names() {
        for (code, name) in [
            (ErrorCode::InvalidRequest, "INVALID_REQUEST"),
            (ErrorCode::InvalidText, "INVALID_TEXT"),
            (ErrorCode::VoiceNotFound, "VOICE_NOT_FOUND"),
            (ErrorCode::ImageNotFound, "IMAGE_NOT_FOUND"),
            (ErrorCode::OutOfMemory, "OUT_OF_MEMORY"),
            (ErrorCode::EngineError, "ENGINE_ERROR"),
        ] {
            assert_eq!(serde_json::to_value(code).unwrap(), name);
        }
    }

    #[test]
    fn test_unknown_type_error_names_the_type() {
        let request = decode(r#"{"type":"transcribe","id":"r9"}"#).unwrap();
        let line = encode(&Response::unknown_type(&request, "r9"));
        assert_eq!(
            line,
            r#"{"type":"error","id":"r9","code":"INVALID_REQUEST","message":"Unknown request type: transcribe"}"#
        );
    }

    #[test]
    fn test_framing_error_response_has_no_id() {
        let err = decode("not json").unwrap_err();
        let response = Response::framing_error(&err);
        match response {
            Response::Error { id, code, message } => {
                assert_eq!(id, None);
                assert_eq!(code, ErrorCode::InvalidRequest);
                assert!(message.starts_with("Invalid JSON: "));
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }
}
