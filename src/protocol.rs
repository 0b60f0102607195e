//! Wire types for the host<->worker protocol.
//!
//! Every frame on either pipe is one `\n`-terminated JSON object. Command
//! traffic and callback traffic share the same two pipes; the host tells
//! them apart by the presence of the `callback` key (see `callback.rs`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC-style error code: malformed input.
pub const ERR_PARSE: i32 = -32700;
/// JSON-RPC-style error code: unrecognized `method`.
pub const ERR_METHOD_NOT_FOUND: i32 = -32601;
/// JSON-RPC-style error code: anything else that went wrong handling a request.
pub const ERR_INTERNAL: i32 = -32603;

/// One line of input from the host.
#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// One line of output to the host, in reply to a `Request`.
#[derive(Debug, Serialize)]
pub struct Response {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

#[derive(Debug, Serialize)]
pub struct ResponseError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl Response {
    pub fn success(id: i64, result: Value) -> Self {
        Self { id, result: Some(result), error: None }
    }

    pub fn error(id: i64, code: i32, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(ResponseError { code, message: message.into(), data: None }),
        }
    }

    pub fn error_with_data(id: i64, code: i32, message: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(ResponseError { code, message: message.into(), data: Some(data.into()) }),
        }
    }
}

/// A worker->host RPC issued while evaluating user code.
#[derive(Debug, Serialize)]
pub struct CallbackRequest {
    pub callback: String,
    pub callback_id: u64,
    pub params: Value,
}

/// The host's reply to a `CallbackRequest`.
#[derive(Debug, Deserialize, Default)]
pub struct CallbackResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub results: Option<Vec<Value>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_success_omits_error() {
        let resp = Response::success(1, serde_json::json!({"ok": true}));
        let line = serde_json::to_string(&resp).unwrap();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["id"], 1);
        assert_eq!(parsed["result"]["ok"], true);
        assert!(parsed.get("error").is_none());
    }

    #[test]
    fn response_error_omits_result() {
        let resp = Response::error(5, ERR_METHOD_NOT_FOUND, "Method not found: bogus");
        let line = serde_json::to_string(&resp).unwrap();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["id"], 5);
        assert_eq!(parsed["error"]["code"], ERR_METHOD_NOT_FOUND);
        assert!(parsed.get("result").is_none());
    }

    #[test]
    fn request_defaults_when_fields_missing() {
        let req: Request = serde_json::from_str(r#"{"id":2,"method":"status"}"#).unwrap();
        assert_eq!(req.id, 2);
        assert_eq!(req.method, "status");
        assert!(req.params.is_null());
    }

    #[test]
    fn callback_response_parses_error_only() {
        let resp: CallbackResponse = serde_json::from_str(r#"{"error":"rate limited"}"#).unwrap();
        assert_eq!(resp.error.as_deref(), Some("rate limited"));
        assert!(resp.result.is_none());
    }
}
