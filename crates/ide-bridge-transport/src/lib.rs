//! Transport layer for talking to the editor bridge.
//!
//! Provides:
//! - WebSocket transport (feature: websocket)
//! - In-memory transport driven by a handler
//! - Fake editor bridge for tests (feature: testing)

pub mod memory;

#[cfg(feature = "websocket")]
pub mod websocket;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use memory::MemoryTransport;

#[cfg(feature = "websocket")]
pub use websocket::WebSocketTransport;
