//! Editor commands as invokable values.

use ide_bridge_core::{Result, Transport};
use serde_json::{Map, Value};

use crate::client::BridgeClient;

/// A named editor command (as listed in the command palette).
///
/// Commands are addressed by name and invoked through `executeCommand`,
/// never through `eval`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandAdapter {
    name: String,
}

impl CommandAdapter {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the command with positional and keyword arguments.
    ///
    /// # Errors
    /// Returns an error if the request fails or the editor reports failure.
    pub async fn call<T: Transport>(
        &self,
        client: &mut BridgeClient<T>,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value> {
        client.execute_command(&self.name, args, kwargs).await
    }

    /// Run the command without arguments.
    ///
    /// # Errors
    /// Returns an error if the request fails or the editor reports failure.
    pub async fn invoke<T: Transport>(&self, client: &mut BridgeClient<T>) -> Result<Value> {
        self.call(client, Vec::new(), Map::new()).await
    }
}
