//! Error taxonomy shared by every layer of the bridge client.

use serde_json::Value;
use thiserror::Error;

use crate::traits::StorageError;

/// Transport-level failure: the channel could not be opened or was lost.
///
/// Never retried by the client; the caller re-opens explicitly.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The websocket handshake with `url` did not complete.
    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },
    /// Sending or receiving failed on an open connection.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),
    /// The bridge closed the socket, or the transport was already closed.
    #[error("Connection closed by remote")]
    Closed,
    /// A request was cancelled mid-flight, so the next reply on the socket
    /// would belong to it.
    #[error("Previous request was abandoned before its reply arrived; reopen the transport")]
    Desynchronized,
    /// A binary frame that is not valid UTF-8.
    #[error("Received a non UTF-8 frame")]
    InvalidFrame,
}

/// Error returned by bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The reply could not be parsed into the expected structure.
    #[error("Protocol error: {message} (raw reply: {raw})")]
    Protocol { message: String, raw: String },

    /// The reply parsed but reported a non-success status.
    #[error("Remote reported failure: {reply}")]
    Rpc { reply: Value },

    /// No session could be resolved, so no request was ever sent.
    #[error("No editor instance called \"{name}\" (known: {})", .known.join(", "))]
    NoInstance { name: String, known: Vec<String> },

    #[error("Operation not supported by the bridge: {0}")]
    UnsupportedOperation(&'static str),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Build a protocol error that keeps the raw payload for diagnosis.
    #[must_use]
    pub fn protocol(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
            raw: raw.into(),
        }
    }

    /// Raw payload of a protocol or RPC failure, if any.
    #[must_use]
    pub fn raw_reply(&self) -> Option<String> {
        match self {
            Self::Protocol { raw, .. } => Some(raw.clone()),
            Self::Rpc { reply } => Some(reply.to_string()),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_instance_lists_known_names() {
        let err = BridgeError::NoInstance {
            name: "proj".to_string(),
            known: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "No editor instance called \"proj\" (known: a, b)"
        );
    }

    #[test]
    fn test_raw_reply_is_preserved() {
        let err = BridgeError::protocol("not json", "<html>");
        assert_eq!(err.raw_reply().as_deref(), Some("<html>"));

        let err = BridgeError::Rpc {
            reply: serde_json::json!({"status": "ERR"}),
        };
        assert_eq!(err.raw_reply().as_deref(), Some(r#"{"status":"ERR"}"#));

        let err = BridgeError::UnsupportedOperation("watchpoints");
        assert!(err.raw_reply().is_none());
    }
}
