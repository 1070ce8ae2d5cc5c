//! OpLowering (§4.8): the last rewrite pass before linking. Turns every
//! surviving `Intrinsic` node into a direct call against a named builtin.

pub mod oplower;

pub use oplower::lower_program;
