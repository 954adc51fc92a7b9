//! Lazy proxies for entities living in the editor process.
//!
//! A proxy only knows its path. Nothing is cached: every enumeration,
//! read, write or call sends a fresh request, because remote state may
//! change between accesses.

use std::collections::VecDeque;

use futures::{
    FutureExt, StreamExt,
    future::BoxFuture,
    stream::{self, BoxStream},
};
use ide_bridge_core::{
    Literal, MemberDescriptor, Members, NodeKind, NodePath, Result, Transport, literal::join_args,
};
use serde_json::Value;

use crate::client::BridgeClient;

/// Any proxy node, classified from its descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteNode {
    Object(RemoteObject),
    Value(RemoteValue),
    Callable(RemoteCallable),
}

impl RemoteNode {
    /// Build the proxy for a child of `parent` described by `descriptor`.
    #[must_use]
    pub fn from_descriptor(parent: &NodePath, descriptor: MemberDescriptor) -> Self {
        let path = parent.child(descriptor.name);
        match descriptor.kind {
            NodeKind::Object => Self::Object(RemoteObject::new(path)),
            NodeKind::Function => Self::Callable(RemoteCallable::new(path, descriptor.params)),
            NodeKind::Value => Self::Value(RemoteValue::new(path)),
        }
    }

    #[must_use]
    pub const fn path(&self) -> &NodePath {
        match self {
            Self::Object(o) => &o.path,
            Self::Value(v) => &v.path,
            Self::Callable(c) => &c.path,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.path().name()
    }

    #[must_use]
    pub fn full_path(&self) -> String {
        self.path().full_path()
    }

    /// Path of the owning object; `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<NodePath> {
        self.path().parent()
    }

    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Object(_) => NodeKind::Object,
            Self::Value(_) => NodeKind::Value,
            Self::Callable(_) => NodeKind::Function,
        }
    }

    #[must_use]
    pub const fn as_object(&self) -> Option<&RemoteObject> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_value(&self) -> Option<&RemoteValue> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_callable(&self) -> Option<&RemoteCallable> {
        match self {
            Self::Callable(c) => Some(c),
            _ => None,
        }
    }

    /// One-line outline entry, as used by [`RemoteObject::describe`].
    #[must_use]
    pub fn outline(&self) -> String {
        match self {
            Self::Object(o) => format!("object {}", o.name()),
            Self::Value(v) => v.name().to_string(),
            Self::Callable(c) => c.signature(),
        }
    }
}

/// A remote object whose children are discovered with `inspect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    path: NodePath,
}

impl RemoteObject {
    #[must_use]
    pub const fn new(path: NodePath) -> Self {
        Self { path }
    }

    /// The implicit root of the remote graph.
    #[must_use]
    pub const fn root() -> Self {
        Self::new(NodePath::root())
    }

    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.path.name()
    }

    #[must_use]
    pub fn full_path(&self) -> String {
        self.path.full_path()
    }

    /// Raw member descriptors, in reply order.
    ///
    /// # Errors
    /// Returns an error if the inspect request fails or its reply is malformed.
    pub async fn members<T: Transport>(&self, client: &mut BridgeClient<T>) -> Result<Members> {
        client.inspect(&self.path).await
    }

    /// Current children, one inspect request per call.
    ///
    /// # Errors
    /// Returns an error if the inspect request fails or any descriptor is
    /// malformed.
    pub async fn children<T: Transport>(
        &self,
        client: &mut BridgeClient<T>,
    ) -> Result<Vec<RemoteNode>> {
        let members = self.members(client).await?;
        Ok(members
            .into_iter()
            .map(|d| RemoteNode::from_descriptor(&self.path, d))
            .collect())
    }

    /// Current child named `name`, if present.
    ///
    /// # Errors
    /// Returns an error if the inspect request fails.
    pub async fn child<T: Transport>(
        &self,
        client: &mut BridgeClient<T>,
        name: &str,
    ) -> Result<Option<RemoteNode>> {
        let members = self.members(client).await?;
        Ok(members
            .into_iter()
            .find(|d| d.name == name)
            .map(|d| RemoteNode::from_descriptor(&self.path, d)))
    }

    /// Walk the whole subtree.
    ///
    /// Yields every direct child first, then the walk of each child object
    /// in turn. Each object is inspected once per walk; calling again walks
    /// the current remote state. The stream ends after the first error.
    pub fn tree_walk<'a, T: Transport>(
        &self,
        client: &'a mut BridgeClient<T>,
    ) -> BoxStream<'a, Result<RemoteNode>> {
        let walk = Walk {
            client,
            start: Some(self.clone()),
            pending: VecDeque::new(),
            stack: Vec::new(),
        };
        stream::try_unfold(walk, Walk::step).boxed()
    }

    /// Indented outline of this object's children; with `recursive`, child
    /// objects are expanded too.
    ///
    /// # Errors
    /// Returns an error if any inspect request fails.
    pub async fn describe<T: Transport>(
        &self,
        client: &mut BridgeClient<T>,
        recursive: bool,
    ) -> Result<String> {
        let mut lines = Vec::new();
        describe_into(self, client, String::new(), recursive, &mut lines).await?;
        Ok(lines.join("\n"))
    }
}

fn describe_into<'a, T: Transport>(
    object: &'a RemoteObject,
    client: &'a mut BridgeClient<T>,
    indent: String,
    recursive: bool,
    lines: &'a mut Vec<String>,
) -> BoxFuture<'a, Result<()>> {
    async move {
        lines.push(format!("{indent}object {}", object.name()).trim_end().to_string());
        let next_indent = format!("{indent}\t");
        for child in object.children(client).await? {
            match child {
                RemoteNode::Object(ref o) if recursive => {
                    describe_into(o, client, next_indent.clone(), true, lines).await?;
                }
                other => lines.push(format!("{next_indent}{}", other.outline())),
            }
        }
        Ok(())
    }
    .boxed()
}

/// State of one tree walk.
struct Walk<'a, T> {
    client: &'a mut BridgeClient<T>,
    /// Object whose children have not been fetched yet.
    start: Option<RemoteObject>,
    /// Fetched nodes not yet yielded.
    pending: VecDeque<RemoteNode>,
    /// Per level, the siblings still to recurse into.
    stack: Vec<std::vec::IntoIter<RemoteNode>>,
}

impl<'a, T: Transport> Walk<'a, T> {
    async fn step(mut self) -> Result<Option<(RemoteNode, Self)>> {
        loop {
            if let Some(node) = self.pending.pop_front() {
                return Ok(Some((node, self)));
            }
            let Some(object) = self.start.take().or_else(|| self.next_object()) else {
                return Ok(None);
            };
            let children = object.children(self.client).await?;
            self.pending.extend(children.iter().cloned());
            self.stack.push(children.into_iter());
        }
    }

    fn next_object(&mut self) -> Option<RemoteObject> {
        loop {
            let level = self.stack.last_mut()?;
            match level.next() {
                Some(RemoteNode::Object(o)) => return Some(o),
                Some(_) => {}
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// A remote leaf value that can be read and assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteValue {
    path: NodePath,
}

impl RemoteValue {
    #[must_use]
    pub const fn new(path: NodePath) -> Self {
        Self { path }
    }

    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.path.name()
    }

    #[must_use]
    pub fn full_path(&self) -> String {
        self.path.full_path()
    }

    /// Expression that reads the value.
    #[must_use]
    pub fn get_expression(&self) -> String {
        format!("{};", self.path)
    }

    /// Expression that assigns `value`.
    #[must_use]
    pub fn set_expression(&self, value: &Literal) -> String {
        format!("{} = {value};", self.path)
    }

    /// Evaluate the value's path and return the bridge's reply.
    ///
    /// # Errors
    /// Returns an error if the evaluation fails.
    pub async fn get<T: Transport>(&self, client: &mut BridgeClient<T>) -> Result<Value> {
        client.eval(&self.get_expression()).await
    }

    /// Assign `value` in the remote process.
    ///
    /// # Errors
    /// Returns an error if the evaluation fails.
    pub async fn set<T: Transport>(
        &self,
        client: &mut BridgeClient<T>,
        value: impl Into<Literal>,
    ) -> Result<Value> {
        client.eval(&self.set_expression(&value.into())).await
    }
}

/// A remote function with its declared parameter names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCallable {
    path: NodePath,
    params: Vec<String>,
}

impl RemoteCallable {
    #[must_use]
    pub const fn new(path: NodePath, params: Vec<String>) -> Self {
        Self { path, params }
    }

    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.path.name()
    }

    #[must_use]
    pub fn full_path(&self) -> String {
        self.path.full_path()
    }

    /// Declared parameter names. Informational only; arity is not checked.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// `def name(a, b)`.
    #[must_use]
    pub fn signature(&self) -> String {
        format!("def {}({})", self.name(), self.params.join(", "))
    }

    /// Expression that calls the function with `args`.
    #[must_use]
    pub fn call_expression(&self, args: &[Literal]) -> String {
        format!("{}({});", self.path, join_args(args))
    }

    /// Call the function in the remote process.
    ///
    /// # Errors
    /// Returns an error if the evaluation fails, including whatever the
    /// remote side reports for an arity mismatch.
    pub async fn call<T: Transport>(
        &self,
        client: &mut BridgeClient<T>,
        args: &[Literal],
    ) -> Result<Value> {
        client.eval(&self.call_expression(args)).await
    }
}
