use thiserror::Error;

use crate::io::matrix_market::MatrixMarketError;

#[derive(Debug, Error)]
pub enum Error {
    /// Structural misuse: a non-power-of-two discriminating bit, builder
    /// misuse, and similar caller mistakes.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A pair set contained node combinations that should never arise, such
    /// as a dimension mismatch. Signals a planner or subdivision bug.
    #[error("node type mismatch: {0}")]
    NodeTypeMismatch(String),

    /// A future block was encountered on the critical path.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error(transparent)]
    MatrixMarket(#[from] MatrixMarketError),
}

pub type Result<T> = std::result::Result<T, Error>;
