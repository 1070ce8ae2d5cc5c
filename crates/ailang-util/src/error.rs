//! Shared error types too small to warrant their own module.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UtilError {
    #[error("symbol index {0} was never interned")]
    UnknownSymbol(u32),

    #[error("node id generator exhausted")]
    NodeIdOverflow,
}

pub type UtilResult<T> = std::result::Result<T, UtilError>;
