//! Core IR (§3) — the typed, ANF-normalized representation every pipeline
//! stage after elaboration reads and rewrites in place (§2).

pub mod adt;
pub mod core;
pub mod types;

pub use adt::{ConstructorInfo, ConstructorMap};
pub use core::{BindingMeta, Expr, IntrinsicOp, MatchArm, Pattern, Program, ProgramFlags, TopLevel};
pub use types::{ClassConstraint, EffectRow, FieldRow, InferId, Kind, Row, RowVarId, Type, TypeScheme};
