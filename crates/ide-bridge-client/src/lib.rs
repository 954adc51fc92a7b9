//! Client for the editor bridge.
//!
//! Provides:
//! - `BridgeClient` - the RPC envelope (`execute`, `eval`, `inspect`,
//!   `execute_command`) with per-client command and API caches
//! - Remote proxies (`RemoteObject`, `RemoteValue`, `RemoteCallable`)
//! - `CommandAdapter` - editor commands as invokable values

pub mod client;
pub mod command;
pub mod proxy;

pub use client::BridgeClient;
pub use command::CommandAdapter;
pub use proxy::{RemoteCallable, RemoteNode, RemoteObject, RemoteValue};
