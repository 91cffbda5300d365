//! A sparse-matrix engine organized around a recursive quadtree of blocks.
//!
//! Matrices are trees whose leaves are doubly-compressed sparse column
//! blocks. The core service is [`multiply`]: a recursive planner walks two
//! trees in lockstep, windowing leaves against inner blocks without copying
//! and accumulating partial products through a sparse accumulator.

pub mod algorithms;
pub mod config;
pub mod error;
pub mod executor;
pub mod generators;
pub mod io;
pub mod matrix;
pub mod quadtree;
pub mod semiring;
pub mod types;

#[cfg(test)]
pub(crate) mod test_util;

pub use algorithms::multiply;
pub use config::Config;
pub use error::{Error, Result};
pub use matrix::{Matrix, matrix_from_tuples};
pub use quadtree::destructor::destroy_parallel;
pub use semiring::{PlusTimes, Semiring};
pub use types::{BlockNnn, Index, Offset, Shape};
