#![forbid(unsafe_code)]

//! Configuration errors raised while wiring reactive cells.

use thiserror::Error;

use super::node::CellId;

/// Programming errors in how a cell graph is declared.
///
/// These surface at definition time rather than on every read, and are not
/// meant to be recovered from at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    #[error("computed {cell} depends on itself")]
    Cycle { cell: CellId },

    #[error("computed {cell} is already defined")]
    AlreadyDefined { cell: CellId },

    #[error("computed {cell} was read before it was defined")]
    Undefined { cell: CellId },
}
