use crate::error::{Error, Result};
use crate::quadtree::node::TreeNode;
use crate::types::{Index, Offset, Shape, clear_all_except_msb};

/// Child positions of an inner block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InnerPosition {
    Nw = 0,
    Ne = 1,
    Sw = 2,
    Se = 3,
}

pub const ALL_INNER_POSITIONS: [InnerPosition; 4] =
    [InnerPosition::Nw, InnerPosition::Ne, InnerPosition::Sw, InnerPosition::Se];

/// An interior node of the quadtree: four children and the power-of-two
/// discriminating bit that splits their coordinate ranges.
///
/// All tuples in the NW and SW children have `col - col_offset` below the
/// bit; NW and NE have `row - row_offset` below it.
#[derive(Debug)]
pub struct InnerBlock<T> {
    discriminating_bit: Index,
    children: [TreeNode<T>; 4],
}

impl<T> InnerBlock<T> {
    pub fn new(discriminating_bit: Index, children: [TreeNode<T>; 4]) -> Result<Self> {
        if discriminating_bit <= 0
            || clear_all_except_msb(discriminating_bit) != discriminating_bit
        {
            return Err(Error::InvalidArgument(format!(
                "discriminating bit {discriminating_bit} is not a positive power of two"
            )));
        }
        Ok(Self { discriminating_bit, children })
    }

    pub fn discriminating_bit(&self) -> Index {
        self.discriminating_bit
    }

    pub fn child(&self, pos: InnerPosition) -> &TreeNode<T> {
        &self.children[pos as usize]
    }

    pub fn children(&self) -> &[TreeNode<T>; 4] {
        &self.children
    }

    pub(crate) fn into_children(self) -> [TreeNode<T>; 4] {
        self.children
    }

    pub fn child_offsets(&self, pos: InnerPosition, my_offset: &Offset) -> Offset {
        Self::child_offsets_for(self.discriminating_bit, pos, my_offset)
    }

    pub fn child_shape(&self, pos: InnerPosition, my_shape: &Shape) -> Shape {
        Self::child_shape_for(self.discriminating_bit, pos, my_shape)
    }

    /// Child offset arithmetic for a block with discriminating bit `d`,
    /// usable before the block exists.
    pub fn child_offsets_for(d: Index, pos: InnerPosition, my_offset: &Offset) -> Offset {
        match pos {
            InnerPosition::Nw => *my_offset,
            InnerPosition::Ne => Offset {
                row_offset: my_offset.row_offset,
                col_offset: my_offset.col_offset | d,
            },
            InnerPosition::Sw => Offset {
                row_offset: my_offset.row_offset | d,
                col_offset: my_offset.col_offset,
            },
            InnerPosition::Se => Offset {
                row_offset: my_offset.row_offset | d,
                col_offset: my_offset.col_offset | d,
            },
        }
    }

    /// Child shape arithmetic for a block with discriminating bit `d`. NW
    /// takes up to `d` rows and columns; the others take the remainder.
    pub fn child_shape_for(d: Index, pos: InnerPosition, my_shape: &Shape) -> Shape {
        let nw = Shape { nrows: d.min(my_shape.nrows), ncols: d.min(my_shape.ncols) };
        match pos {
            InnerPosition::Nw => nw,
            InnerPosition::Ne => Shape { nrows: nw.nrows, ncols: my_shape.ncols - nw.ncols },
            InnerPosition::Sw => Shape { nrows: my_shape.nrows - nw.nrows, ncols: nw.ncols },
            InnerPosition::Se => Shape {
                nrows: my_shape.nrows - nw.nrows,
                ncols: my_shape.ncols - nw.ncols,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY4: [TreeNode<f64>; 4] =
        [TreeNode::Empty, TreeNode::Empty, TreeNode::Empty, TreeNode::Empty];

    #[test]
    fn rejects_bad_discriminating_bits() {
        assert!(InnerBlock::<f64>::new(0, EMPTY4).is_err());
        assert!(InnerBlock::<f64>::new(-4, EMPTY4).is_err());
        assert!(InnerBlock::<f64>::new(3, EMPTY4).is_err());
        assert!(InnerBlock::<f64>::new(6, EMPTY4).is_err());
        assert!(InnerBlock::<f64>::new(1, EMPTY4).is_ok());
        assert!(InnerBlock::<f64>::new(4096, EMPTY4).is_ok());
    }

    #[test]
    fn child_shapes_partition_a_ragged_block() {
        // 7x7 block split at 4: NW 4x4, NE 4x3, SW 3x4, SE 3x3
        let shape = Shape { nrows: 7, ncols: 7 };
        let inner = InnerBlock::<f64>::new(4, EMPTY4).unwrap();
        assert_eq!(inner.child_shape(InnerPosition::Nw, &shape), Shape { nrows: 4, ncols: 4 });
        assert_eq!(inner.child_shape(InnerPosition::Ne, &shape), Shape { nrows: 4, ncols: 3 });
        assert_eq!(inner.child_shape(InnerPosition::Sw, &shape), Shape { nrows: 3, ncols: 4 });
        assert_eq!(inner.child_shape(InnerPosition::Se, &shape), Shape { nrows: 3, ncols: 3 });
    }

    #[test]
    fn child_shapes_collapse_on_short_dimensions() {
        // 1x10 block split at 8: the south row band is empty
        let shape = Shape { nrows: 1, ncols: 10 };
        let inner = InnerBlock::<f64>::new(8, EMPTY4).unwrap();
        assert_eq!(inner.child_shape(InnerPosition::Nw, &shape), Shape { nrows: 1, ncols: 8 });
        assert_eq!(inner.child_shape(InnerPosition::Ne, &shape), Shape { nrows: 1, ncols: 2 });
        assert_eq!(inner.child_shape(InnerPosition::Sw, &shape), Shape { nrows: 0, ncols: 8 });
        assert_eq!(inner.child_shape(InnerPosition::Se, &shape), Shape { nrows: 0, ncols: 2 });
    }

    #[test]
    fn child_offsets_add_the_bit() {
        let inner = InnerBlock::<f64>::new(4, EMPTY4).unwrap();
        let base = Offset { row_offset: 8, col_offset: 8 };
        assert_eq!(inner.child_offsets(InnerPosition::Nw, &base), base);
        assert_eq!(
            inner.child_offsets(InnerPosition::Ne, &base),
            Offset { row_offset: 8, col_offset: 12 }
        );
        assert_eq!(
            inner.child_offsets(InnerPosition::Sw, &base),
            Offset { row_offset: 12, col_offset: 8 }
        );
        assert_eq!(
            inner.child_offsets(InnerPosition::Se, &base),
            Offset { row_offset: 12, col_offset: 12 }
        );
    }
}
