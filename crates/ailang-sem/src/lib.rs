//! Elaborator and type checker (§4.1-§4.4): Surface AST → Core v1, plus
//! Hindley-Milner inference extended with row polymorphism and class
//! constraints.

pub mod elaborate;
pub mod infer;
pub mod scope;
pub mod typecheck;

pub use elaborate::{call_graph_sccs, elaborate_file, ElabError, Elaborator};
pub use infer::{TypeError, Unifier};
pub use scope::{RibId, RibKind, ScopeTree};
pub use typecheck::{infer_program, method_for_binop, InferenceResult, OverloadSite};
