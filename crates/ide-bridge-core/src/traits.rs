//! Core traits for transports and instance storage.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::endpoint::{DEFAULT_HOST, Endpoint};
use crate::error::TransportError;

/// Operating-system process identifier of an editor instance.
pub type ProcessId = u32;

/// One running editor instance as recorded in the registry file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    /// Human-chosen instance name (usually the project path).
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    pub pid: ProcessId,
    /// Native window handle, backfilled lazily.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hwnd: Option<u64>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

impl SessionDescriptor {
    /// Connection parameters of this instance.
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.host.clone(),
            port: self.port,
        }
    }
}

/// Registry contents keyed by process id.
pub type InstanceMap = BTreeMap<ProcessId, SessionDescriptor>;

/// Storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed registry: {0}")]
    Malformed(String),
    #[error("Storage error: {0}")]
    Internal(String),
}

/// Trait for instance registry backends.
#[async_trait]
pub trait InstanceStorage: Send + Sync {
    /// Load every recorded instance. A missing store is empty.
    async fn load(&self) -> Result<InstanceMap, StorageError>;

    /// Replace the stored instances.
    async fn save(&self, instances: &InstanceMap) -> Result<(), StorageError>;
}

/// Half-duplex request/response channel to a bridge.
///
/// Exactly one reply is read per request. Taking `&mut self` means a second
/// request cannot be issued while one is outstanding.
#[async_trait]
pub trait Transport: Send {
    /// Establish the connection if absent, or unconditionally when `force`
    /// is set (closing any prior connection first).
    async fn open(&mut self, force: bool) -> Result<(), TransportError>;

    /// Release the connection. Idempotent.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Write one message and wait for its reply, opening lazily.
    async fn send(&mut self, message: String) -> Result<String, TransportError>;

    /// Whether a connection is currently held.
    fn is_open(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_wire_format() {
        let raw = r#"{"1234":{"name":"~/myProgram","host":"localhost","port":8180,"pid":1234,"hwnd":5678}}"#;
        let map: InstanceMap = serde_json::from_str(raw).unwrap();
        let desc = &map[&1234];
        assert_eq!(desc.name, "~/myProgram");
        assert_eq!(desc.hwnd, Some(5678));
        assert_eq!(desc.endpoint(), Endpoint::local(8180));
        assert_eq!(serde_json::to_string(&map).unwrap(), raw);
    }

    #[test]
    fn test_descriptor_defaults() {
        let desc: SessionDescriptor =
            serde_json::from_str(r#"{"name":"p","port":1,"pid":2}"#).unwrap();
        assert_eq!(desc.host, "localhost");
        assert!(desc.hwnd.is_none());
        assert!(!serde_json::to_string(&desc).unwrap().contains("hwnd"));
    }
}
