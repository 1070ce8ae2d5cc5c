//! Constraint solving, defaulting, and dictionary elaboration (§4.7):
//! Core v1 (with `BinOp`/`UnOp` placeholders) → Core v2 (`DictApp`/`DictRef`).

pub mod dict_elab;
pub mod instances;
pub mod solve;

pub use dict_elab::elaborate_dicts;
pub use instances::{class_eq, class_ord, class_for_method_and_type, instances_for_method};
pub use solve::{
    collapse_numeric_classes, most_specific, normalize_type_name, ClassError, DefaultTable, ResolvedConstraint,
    Solver,
};
