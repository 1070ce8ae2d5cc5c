//! The linker (§4.9): resolves every global reference a lowered program
//! still carries against loaded modules, the ADT constructor map, and the
//! frozen builtin surface, then marks the program ready for evaluation.

pub mod link;
pub mod loader;

pub use link::{dry_run, link, DictKey, LinkContext};
pub use loader::{CompiledModule, ModuleLoader};
