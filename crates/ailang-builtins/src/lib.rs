//! Builtin Registry (§4.5) — the consistency core every primitive's arity,
//! purity, effect label, and type must agree on across the elaborator,
//! checker, and evaluator.

pub mod registry;
pub mod surface;

pub use registry::{BuiltinError, BuiltinFn, BuiltinRegistry, BuiltinSpec};
pub use surface::{stdlib_surface, BuiltinDescriptor};
