//! Registry of running editor instances.
//!
//! Provides:
//! - `InstanceRegistry` - resolve an instance name to its bridge endpoint,
//!   prune dead entries and launch new editors
//! - `ProcessProbe` / `SysinfoProbe` - process liveness checks
//! - Storage implementations (JSON file, memory)

pub mod probe;
pub mod registry;
pub mod storage;

pub use probe::{ProcessProbe, SysinfoProbe};
pub use registry::{InstanceRegistry, LaunchOptions};
