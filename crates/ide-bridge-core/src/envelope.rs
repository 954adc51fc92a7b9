//! Request/reply envelope exchanged with the bridge.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::descriptor::Members;
use crate::error::{BridgeError, Result};

/// Status value the bridge uses for success.
pub const STATUS_OK: &str = "OK";

/// One request frame: `{command, args, kwargs}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Bridge command, e.g. `inspect`, `eval` or `executeCommand`.
    pub command: String,
    /// Positional arguments, in call order.
    #[serde(default)]
    pub args: Vec<Value>,
    /// Named arguments; keys keep their insertion order on the wire.
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl Request {
    /// Create a request with positional arguments only.
    #[must_use]
    pub fn new(command: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            command: command.into(),
            args,
            kwargs: Map::new(),
        }
    }

    /// Attach keyword arguments.
    #[must_use]
    pub fn with_kwargs(mut self, kwargs: Map<String, Value>) -> Self {
        self.kwargs = kwargs;
        self
    }

    /// Serialize to the text frame sent on the wire.
    ///
    /// # Errors
    /// Returns a protocol error if a value cannot be encoded.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| BridgeError::protocol(format!("Failed to encode request: {e}"), ""))
    }
}

/// Parse a general reply.
///
/// A reply carrying a `status` field other than `"OK"` is an RPC error.
///
/// # Errors
/// Returns [`BridgeError::Protocol`] if the payload is not JSON, or
/// [`BridgeError::Rpc`] if it reports failure.
pub fn decode_reply(raw: &str) -> Result<Value> {
    let reply: Value = serde_json::from_str(raw)
        .map_err(|e| BridgeError::protocol(format!("Reply is not valid JSON: {e}"), raw))?;

    match reply.get("status") {
        Some(Value::String(s)) if s == STATUS_OK => Ok(reply),
        Some(_) => Err(BridgeError::Rpc { reply }),
        None => Ok(reply),
    }
}

/// Reply to an `inspect` request.
#[derive(Debug, Clone, Deserialize)]
struct InspectReply {
    status: String,
    #[serde(default)]
    members: Option<Map<String, Value>>,
}

/// Extract the member descriptors from an `inspect` reply.
///
/// Never returns a partial mapping: any failure discards the whole reply.
///
/// # Errors
/// Returns [`BridgeError::Rpc`] when the status is not `"OK"` and
/// [`BridgeError::Protocol`] when the reply is malformed.
pub fn decode_inspect(reply: Value) -> Result<Members> {
    let raw = reply.to_string();
    let parsed: InspectReply = serde_json::from_value(reply.clone())
        .map_err(|e| BridgeError::protocol(format!("Malformed inspect reply: {e}"), &raw))?;

    if parsed.status != STATUS_OK {
        return Err(BridgeError::Rpc { reply });
    }

    let members = parsed
        .members
        .ok_or_else(|| BridgeError::protocol("Inspect reply has no members", &raw))?;
    Members::from_wire(members).map_err(|message| BridgeError::protocol(message, raw))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let mut kwargs = Map::new();
        kwargs.insert("includeUntitled".to_string(), json!(false));
        let req = Request::new("saveAll", vec![]).with_kwargs(kwargs);
        let encoded = req.encode().unwrap();
        assert_eq!(
            encoded,
            r#"{"command":"saveAll","args":[],"kwargs":{"includeUntitled":false}}"#
        );
    }

    #[test]
    fn test_request_fields_default_and_keep_order() {
        let req: Request = serde_json::from_str(r#"{"command":"getCommands"}"#).unwrap();
        assert_eq!(req, Request::new("getCommands", vec![]));

        let req: Request =
            serde_json::from_str(r#"{"command":"x","kwargs":{"zeta":1,"alpha":2}}"#).unwrap();
        let keys: Vec<_> = req.kwargs.keys().map(String::as_str).collect();
        assert_eq!(keys, ["zeta", "alpha"]);
    }

    #[test]
    fn test_decode_reply_passes_through_payloads() {
        assert_eq!(decode_reply("42").unwrap(), json!(42));
        assert_eq!(
            decode_reply(r#"{"status":"OK","result":1}"#).unwrap(),
            json!({"status": "OK", "result": 1})
        );
    }

    #[test]
    fn test_decode_reply_error_status() {
        let err = decode_reply(r#"{"status":"ERROR","message":"boom"}"#).unwrap_err();
        match err {
            BridgeError::Rpc { reply } => assert_eq!(reply["message"], "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_reply_keeps_raw_payload() {
        let err = decode_reply("not json at all").unwrap_err();
        assert_eq!(err.raw_reply().as_deref(), Some("not json at all"));
    }

    #[test]
    fn test_decode_inspect_non_ok_is_rpc_error() {
        let reply = json!({"status": "FAIL", "members": {"a": {"type": "object"}}});
        assert!(matches!(decode_inspect(reply), Err(BridgeError::Rpc { .. })));
    }

    #[test]
    fn test_decode_inspect_missing_status_is_protocol_error() {
        let reply = json!({"members": {}});
        assert!(matches!(decode_inspect(reply), Err(BridgeError::Protocol { .. })));
    }

    #[test]
    fn test_decode_inspect_members_in_order() {
        let reply = json!({
            "status": "OK",
            "members": {
                "zeta": {"type": "object"},
                "alpha": {"type": "function", "params": ["x"]},
            }
        });
        let members = decode_inspect(reply).unwrap();
        let names: Vec<_> = members.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha"]);
    }
}
