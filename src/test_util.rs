//! Shared test fixtures.

use rand::SeedableRng;
use rand::seq::SliceRandom;

use crate::matrix::Matrix;
use crate::types::Index;

/// The canonical 7-node, 12-edge directed graph adjacency matrix used
/// throughout the graph-BLAS literature.
pub fn kepner_gilbert_tuples() -> Vec<(Index, Index, f64)> {
    vec![
        (1, 0, 1.0),
        (3, 0, 1.0),
        (4, 1, 1.0),
        (6, 1, 1.0),
        (5, 2, 1.0),
        (0, 3, 1.0),
        (2, 3, 1.0),
        (5, 4, 1.0),
        (2, 5, 1.0),
        (2, 6, 1.0),
        (3, 6, 1.0),
        (4, 6, 1.0),
    ]
}

/// All tuples of a matrix, sorted by `(row, col)` for comparisons.
pub fn dump_tuples<T: Copy>(matrix: &Matrix<T>) -> Vec<(Index, Index, T)> {
    let mut tuples = matrix.to_tuples();
    tuples.sort_unstable_by_key(|&(row, col, _)| (row, col));
    tuples
}

/// Shuffle with a fixed seed so test inputs stay reproducible.
pub fn stable_shuffle<T>(items: &mut [T], seed: u64) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);
}

/// Opt into log output for a test run (`RUST_LOG=trace cargo test`).
#[allow(dead_code)]
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
