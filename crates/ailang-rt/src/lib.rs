//! The evaluator (§4.10): a tree-walking interpreter over linked, lowered
//! Core, plus the concrete value representation, environment, effect
//! capability context, and builtin implementations it runs against.

pub mod builtins;
pub mod effects;
pub mod env;
pub mod eval;
pub mod value;

pub use builtins::{build_dict_table, prelude_registry};
pub use effects::EffContext;
pub use env::Env;
pub use eval::{Evaluator, RuntimeFault};
pub use value::{Closure, DictValue, ErrorValue, Value};
