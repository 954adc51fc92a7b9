//! Storage implementations.

pub mod file;

#[cfg(feature = "memory")]
pub mod memory;

pub use file::FileStorage;

#[cfg(feature = "memory")]
pub use memory::MemoryStorage;
