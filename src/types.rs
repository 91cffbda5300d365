use std::fmt;
use std::ops::Add;

/// Matrix-wide row/column index. Signed so offset arithmetic can go through
/// intermediate negative values without surprises.
pub type Index = i64;

/// Entry count within a single leaf block. Leaves are kept well below this
/// range by the split threshold.
pub type BlockNnn = i32;

/// Number of rows and columns of a matrix or block region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Shape {
    pub nrows: Index,
    pub ncols: Index,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.nrows, self.ncols)
    }
}

/// Matrix-global coordinate of a block's (0, 0). Leaf blocks store indices
/// relative to their position in the quadtree; the offset recovers the
/// absolute coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offset {
    pub row_offset: Index,
    pub col_offset: Index,
}

impl Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Offset {
        Offset {
            row_offset: self.row_offset + rhs.row_offset,
            col_offset: self.col_offset + rhs.col_offset,
        }
    }
}

/// Storage accounting for a block or a whole tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockSizeInfo {
    pub index_bytes: usize,
    pub value_bytes: usize,
    pub overhead_bytes: usize,
    pub nnn: usize,
}

impl BlockSizeInfo {
    pub fn total_bytes(&self) -> usize {
        self.index_bytes + self.value_bytes + self.overhead_bytes
    }
}

impl Add for BlockSizeInfo {
    type Output = BlockSizeInfo;

    fn add(self, rhs: BlockSizeInfo) -> BlockSizeInfo {
        BlockSizeInfo {
            index_bytes: self.index_bytes + rhs.index_bytes,
            value_bytes: self.value_bytes + rhs.value_bytes,
            overhead_bytes: self.overhead_bytes + rhs.overhead_bytes,
            nnn: self.nnn + rhs.nnn,
        }
    }
}

/// Keep only the most significant set bit of `n`. Zero for non-positive input.
pub fn clear_all_except_msb(n: Index) -> Index {
    if n <= 0 {
        return 0;
    }
    1 << (Index::BITS - 1 - n.leading_zeros())
}

/// The discriminating bit to use if a block of this shape is subdivided: the
/// largest power of two that is at most `max(nrows, ncols) - 1`.
pub fn discriminating_bit(shape: &Shape) -> Index {
    let dim_max = shape.nrows.max(shape.ncols);
    if dim_max < 2 {
        return 1;
    }
    clear_all_except_msb(dim_max - 1)
}

/// Discriminating bit of a child inner node given the parent's bit. Bottoms
/// out at 1.
pub fn child_discriminating_bit(parent_discriminating_bit: Index) -> Index {
    if parent_discriminating_bit > 1 {
        parent_discriminating_bit >> 1
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msb_extraction() {
        assert_eq!(clear_all_except_msb(0), 0);
        assert_eq!(clear_all_except_msb(-5), 0);
        assert_eq!(clear_all_except_msb(1), 1);
        assert_eq!(clear_all_except_msb(2), 2);
        assert_eq!(clear_all_except_msb(3), 2);
        assert_eq!(clear_all_except_msb(1023), 512);
        assert_eq!(clear_all_except_msb(1024), 1024);
    }

    #[test]
    fn discriminating_bit_of_shape() {
        // degenerate shapes never subdivide below bit 1
        assert_eq!(discriminating_bit(&Shape { nrows: 0, ncols: 0 }), 1);
        assert_eq!(discriminating_bit(&Shape { nrows: 1, ncols: 1 }), 1);
        // power-of-two edge: an 8x8 block splits at 4
        assert_eq!(discriminating_bit(&Shape { nrows: 8, ncols: 8 }), 4);
        assert_eq!(discriminating_bit(&Shape { nrows: 9, ncols: 9 }), 8);
        // rectangular shapes use the larger dimension
        assert_eq!(discriminating_bit(&Shape { nrows: 1, ncols: 100 }), 64);
    }

    #[test]
    fn child_bit_halves_and_bottoms_out() {
        assert_eq!(child_discriminating_bit(8), 4);
        assert_eq!(child_discriminating_bit(2), 1);
        assert_eq!(child_discriminating_bit(1), 1);
    }

    #[test]
    fn offsets_compose_additively() {
        let a = Offset { row_offset: 2, col_offset: 3 };
        let b = Offset { row_offset: 10, col_offset: 20 };
        assert_eq!(a + b, Offset { row_offset: 12, col_offset: 23 });
    }
}
