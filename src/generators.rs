//! Tuple generators for building stock matrices without coordinate lists.

use crate::types::{Index, Shape};

/// `(i, i, value)` for `i` in `[0, n)`.
pub fn identity_tuples<T: Copy>(n: Index, value: T) -> impl Iterator<Item = (Index, Index, T)> {
    (0..n).map(move |i| (i, i, value))
}

/// Every cell of `shape` set to `value`, emitted column-major.
pub fn full_tuples<T: Copy>(shape: Shape, value: T) -> impl Iterator<Item = (Index, Index, T)> {
    (0..shape.ncols).flat_map(move |col| (0..shape.nrows).map(move |row| (row, col, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_generates_the_diagonal() {
        let tuples: Vec<_> = identity_tuples(3, 1.0).collect();
        assert_eq!(tuples, vec![(0, 0, 1.0), (1, 1, 1.0), (2, 2, 1.0)]);
    }

    #[test]
    fn full_covers_the_shape_column_major() {
        let tuples: Vec<_> = full_tuples(Shape { nrows: 2, ncols: 3 }, 9).collect();
        assert_eq!(
            tuples,
            vec![(0, 0, 9), (1, 0, 9), (0, 1, 9), (1, 1, 9), (0, 2, 9), (1, 2, 9)]
        );
    }
}
