//! Bridge client: the RPC envelope over a single transport.

use ide_bridge_core::{
    BridgeError, Members, NodePath, Request, Result, Transport,
    envelope::{decode_inspect, decode_reply},
};
use serde_json::{Map, Value};

use crate::command::CommandAdapter;
use crate::proxy::RemoteObject;

/// Client for one editor instance.
///
/// Every operation sends exactly one request and awaits exactly one reply.
/// Methods take `&mut self`, so requests on one client are never
/// interleaved; use separate clients for parallel work.
pub struct BridgeClient<T> {
    transport: T,
    instance_name: Option<String>,
    commands: Option<Vec<String>>,
    api_functions: Option<Vec<String>>,
}

impl<T: Transport> BridgeClient<T> {
    /// Create a client over `transport`. Nothing is sent yet.
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            instance_name: None,
            commands: None,
            api_functions: None,
        }
    }

    /// Record the registry name this client was resolved from.
    #[must_use]
    pub fn with_instance_name(mut self, name: impl Into<String>) -> Self {
        self.instance_name = Some(name.into());
        self
    }

    /// Registry name of the instance, or `""` when connected by address.
    #[must_use]
    pub fn instance_name(&self) -> &str {
        self.instance_name.as_deref().unwrap_or("")
    }

    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Open (or with `force`, re-open) the connection.
    ///
    /// # Errors
    /// Returns a transport error if the bridge cannot be reached.
    pub async fn open(&mut self, force: bool) -> Result<()> {
        Ok(self.transport.open(force).await?)
    }

    /// Close the connection. Idempotent.
    ///
    /// # Errors
    /// Returns a transport error if closing fails.
    pub async fn close(&mut self) -> Result<()> {
        Ok(self.transport.close().await?)
    }

    /// Run a bridge command and return its decoded reply.
    ///
    /// # Errors
    /// Returns a transport error if the exchange fails, a protocol error if
    /// the reply is not JSON, or an RPC error if it reports failure.
    pub async fn execute(
        &mut self,
        command: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value> {
        let request = Request::new(command, args).with_kwargs(kwargs);
        let frame = request.encode()?;
        tracing::debug!(command, args = request.args.len(), "Sending bridge request");

        let raw = self.transport.send(frame).await?;
        decode_reply(&raw).inspect_err(|e| {
            tracing::debug!(command, "Bridge request failed: {e}");
        })
    }

    /// Run a bridge command with positional arguments only.
    ///
    /// # Errors
    /// See [`execute`](Self::execute).
    pub async fn execute_api(&mut self, command: &str, args: Vec<Value>) -> Result<Value> {
        self.execute(command, args, Map::new()).await
    }

    /// Evaluate `expression` as code in the editor process.
    ///
    /// # Errors
    /// See [`execute`](Self::execute).
    pub async fn eval(&mut self, expression: &str) -> Result<Value> {
        self.execute_api("eval", vec![Value::from(expression)]).await
    }

    /// Describe the members of the object at `path` (the implicit root when
    /// the path is empty).
    ///
    /// # Errors
    /// Returns an RPC error if the bridge reports failure and a protocol
    /// error if the reply is malformed. No partial mapping is ever returned.
    pub async fn inspect(&mut self, path: &NodePath) -> Result<Members> {
        let args = if path.is_root() {
            Vec::new()
        } else {
            vec![Value::from(path.full_path())]
        };
        let reply = self.execute_api("inspect", args).await?;
        decode_inspect(reply)
    }

    /// Run an editor command (as from the command palette).
    ///
    /// # Errors
    /// See [`execute`](Self::execute).
    pub async fn execute_command(
        &mut self,
        name: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value> {
        let mut full_args = Vec::with_capacity(args.len() + 1);
        full_args.push(Value::from(name));
        full_args.extend(args);
        self.execute("executeCommand", full_args, kwargs).await
    }

    /// Available editor commands, queried once and then cached.
    ///
    /// # Errors
    /// Returns an error if the first query fails.
    pub async fn commands(&mut self) -> Result<Vec<CommandAdapter>> {
        if self.commands.is_none() {
            return self.refresh_commands().await;
        }
        Ok(self.cached_commands())
    }

    /// Re-query the editor command list, replacing the cache.
    ///
    /// # Errors
    /// Returns an error if the query fails; the previous cache is kept.
    pub async fn refresh_commands(&mut self) -> Result<Vec<CommandAdapter>> {
        let reply = self.execute_api("getCommands", Vec::new()).await?;
        let names = string_list(&reply)
            .ok_or_else(|| BridgeError::protocol("getCommands did not return a list of names", reply.to_string()))?;
        tracing::debug!(count = names.len(), "Refreshed editor command list");
        self.commands = Some(names);
        Ok(self.cached_commands())
    }

    fn cached_commands(&self) -> Vec<CommandAdapter> {
        self.commands
            .iter()
            .flatten()
            .map(CommandAdapter::new)
            .collect()
    }

    /// Adapter for a command by name, without checking it exists.
    #[must_use]
    pub fn command(&self, name: impl Into<String>) -> CommandAdapter {
        CommandAdapter::new(name)
    }

    /// Names of the top-level editor API members, queried once and cached.
    ///
    /// # Errors
    /// Returns an error if the first query fails.
    pub async fn api_functions(&mut self) -> Result<&[String]> {
        if self.api_functions.is_none() {
            return self.refresh_api().await;
        }
        Ok(self.api_functions.as_deref().unwrap_or_default())
    }

    /// Re-query the editor API surface, replacing the cache.
    ///
    /// # Errors
    /// Returns an error if the query fails; the previous cache is kept.
    pub async fn refresh_api(&mut self) -> Result<&[String]> {
        let reply = self.execute_api("queryApi", vec![Value::from("vscode")]).await?;
        let names: Vec<String> = reply
            .get("members")
            .and_then(Value::as_object)
            .ok_or_else(|| BridgeError::protocol("queryApi reply has no members", reply.to_string()))?
            .keys()
            .cloned()
            .collect();
        let names: &[String] = self.api_functions.insert(names);
        Ok(names)
    }

    /// Proxy for the implicit root of the remote object graph.
    #[must_use]
    pub fn root(&self) -> RemoteObject {
        RemoteObject::root()
    }

    /// Proxy for the object at a dotted path, e.g. `vscode.window`.
    #[must_use]
    pub fn object(&self, dotted: &str) -> RemoteObject {
        RemoteObject::new(NodePath::parse(dotted))
    }
}

#[cfg(feature = "websocket")]
impl BridgeClient<ide_bridge_transport::WebSocketTransport> {
    /// Connect to the bridge listening at `endpoint`.
    ///
    /// # Errors
    /// Returns a transport error if the connection cannot be opened.
    pub async fn connect(endpoint: ide_bridge_core::Endpoint) -> Result<Self> {
        let mut client = Self::new(ide_bridge_transport::WebSocketTransport::new(endpoint));
        client.open(false).await?;
        Ok(client)
    }

    /// Address of the bridge this client talks to.
    #[must_use]
    pub const fn endpoint(&self) -> &ide_bridge_core::Endpoint {
        self.transport.endpoint()
    }

    /// Point the client at another bridge; the next request reconnects.
    pub fn set_endpoint(&mut self, endpoint: ide_bridge_core::Endpoint) {
        self.transport.set_endpoint(endpoint);
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}
