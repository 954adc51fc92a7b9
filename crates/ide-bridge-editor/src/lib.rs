//! Editor and debugger control on top of the bridge client.
//!
//! Provides:
//! - `Editor` - project, file and debugger operations
//! - `create_workspace` - `.code-workspace` file generation
//! - `ExtensionList` - installed extensions from `extensions.json`, and installs

pub mod editor;
pub mod extensions;
mod tree;
pub mod workspace;

pub use editor::Editor;
pub use extensions::{EXTENSIONS_FILE, Extension, ExtensionList};
pub use workspace::create_workspace;
