//! Connection addressing for a bridge instance.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Host used when none is given.
pub const DEFAULT_HOST: &str = "localhost";

/// `(host, port)` pair of a running bridge.
///
/// There is no default port: callers supply one or resolve it through the
/// instance registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Endpoint on the default host.
    #[must_use]
    pub fn local(port: u16) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port,
        }
    }

    /// Endpoint on an explicit host; `None` means the default host.
    #[must_use]
    pub fn new(host: Option<String>, port: u16) -> Self {
        Self {
            host: host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
        }
    }

    /// Websocket URL of the bridge.
    #[must_use]
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
