//! Member descriptors returned by `inspect`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of a remote member, classified from the descriptor's `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Object,
    Function,
    /// Anything that is neither an object nor a function.
    Value,
}

impl NodeKind {
    /// Classify a wire `type` tag.
    #[must_use]
    pub fn classify(type_tag: &str) -> Self {
        match type_tag {
            "object" => Self::Object,
            "function" => Self::Function,
            _ => Self::Value,
        }
    }
}

/// Wire form of one descriptor: `{name?, type, params?}`.
#[derive(Debug, Clone, Deserialize)]
struct WireDescriptor {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    type_tag: String,
    #[serde(default)]
    params: Option<Vec<String>>,
}

/// Description of one child of a remote object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberDescriptor {
    pub name: String,
    pub kind: NodeKind,
    /// Declared parameter names; empty unless `kind` is `Function`.
    pub params: Vec<String>,
    /// Original `type` tag, kept for display.
    pub type_tag: String,
}

/// Ordered descriptors of an object's members, in reply order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Members(Vec<MemberDescriptor>);

impl Members {
    /// Build from the wire `members` mapping.
    ///
    /// A descriptor without a `name` takes its mapping key.
    ///
    /// # Errors
    /// Returns a message naming the offending member if a descriptor is
    /// malformed (for example, missing `type`).
    pub fn from_wire(members: Map<String, Value>) -> Result<Self, String> {
        members
            .into_iter()
            .map(|(key, value)| {
                let wire: WireDescriptor = serde_json::from_value(value)
                    .map_err(|e| format!("Malformed descriptor for member \"{key}\": {e}"))?;
                let kind = NodeKind::classify(&wire.type_tag);
                Ok(MemberDescriptor {
                    name: wire.name.unwrap_or(key),
                    kind,
                    params: wire.params.unwrap_or_default(),
                    type_tag: wire.type_tag,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MemberDescriptor> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a member by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MemberDescriptor> {
        self.0.iter().find(|d| d.name == name)
    }
}

impl IntoIterator for Members {
    type Item = MemberDescriptor;
    type IntoIter = std::vec::IntoIter<MemberDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Members {
    type Item = &'a MemberDescriptor;
    type IntoIter = std::slice::Iter<'a, MemberDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
