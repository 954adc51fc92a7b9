//! Core abstractions for the editor bridge client.
//!
//! This crate provides the fundamental building blocks:
//! - `Request` / reply decoding - the JSON envelope spoken with the bridge
//! - `Members` - classified descriptors returned by `inspect`
//! - `Literal` - the narrow serializer used to build remote expressions
//! - `NodePath` - dotted addressing of remote entities
//! - `BridgeError` - the error taxonomy
//! - Transport and storage traits

pub mod descriptor;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod literal;
pub mod path;
pub mod traits;

pub use descriptor::{MemberDescriptor, Members, NodeKind};
pub use endpoint::{DEFAULT_HOST, Endpoint};
pub use envelope::Request;
pub use error::{BridgeError, Result, TransportError};
pub use literal::Literal;
pub use path::NodePath;
pub use traits::{InstanceMap, InstanceStorage, ProcessId, SessionDescriptor, StorageError, Transport};
