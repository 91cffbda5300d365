//! Subdivision of a leaf into four shadow-leaf quadrants.
//!
//! The recursive multiply sometimes aligns a leaf against an inner block.
//! Rather than copy the leaf's tuples into four new leaves, wrap it in a
//! virtual inner block whose children are window shadows over the quadrants.

use std::sync::Arc;

use crate::error::Result;
use crate::quadtree::inner::{ALL_INNER_POSITIONS, InnerBlock, InnerPosition};
use crate::quadtree::node::{LeafNode, TreeNode};
use crate::types::{Index, Offset, Shape, child_discriminating_bit};

/// Wrap `leaf` in an inner block with four shadow children, splitting at the
/// child bit of `parent_discriminating_bit`. Quadrants on a side of the
/// column split with no columns at all stay empty.
pub fn shadow_subdivide<T: Copy>(
    leaf: &LeafNode<T>,
    shape: Shape,
    parent_discriminating_bit: Index,
) -> Result<Arc<InnerBlock<T>>> {
    let d = child_discriminating_bit(parent_discriminating_bit);

    let (col_range_begin, col_range_end) = leaf.column_range();
    let division = leaf.column_division(d);

    let mut children = [TreeNode::Empty, TreeNode::Empty, TreeNode::Empty, TreeNode::Empty];
    for pos in ALL_INNER_POSITIONS {
        let west = matches!(pos, InnerPosition::Nw | InnerPosition::Sw);
        let side_has_columns =
            if west { division > col_range_begin } else { division < col_range_end };
        if !side_has_columns {
            continue;
        }

        let child_shape = InnerBlock::<T>::child_shape_for(d, pos, &shape);
        if child_shape.nrows <= 0 || child_shape.ncols <= 0 {
            continue;
        }

        let child_offsets = InnerBlock::<T>::child_offsets_for(d, pos, &Offset::default());
        children[pos as usize] = TreeNode::Leaf(leaf.shadow(child_offsets, child_shape));
    }

    Ok(Arc::new(InnerBlock::new(d, children)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::quadtree::container::SingleBlockContainer;
    use crate::quadtree::subdivide::subdivide;
    use crate::quadtree::triples::TriplesBlock;
    use crate::test_util::kepner_gilbert_tuples;

    fn single_leaf(tuples: Vec<(Index, Index, f64)>, shape: Shape) -> LeafNode<f64> {
        let mut block = TriplesBlock::new();
        block.extend(tuples);
        let node = subdivide(&block, shape, &Config::default()).unwrap();
        let TreeNode::Leaf(leaf) = node else { panic!("expected a single leaf") };
        leaf
    }

    #[test]
    fn quadrant_union_preserves_tuples() {
        let shape = Shape { nrows: 7, ncols: 7 };
        let leaf = single_leaf(kepner_gilbert_tuples(), shape);
        let parent_bit = SingleBlockContainer::<f64>::discriminating_bit_for(&shape);

        let inner = shadow_subdivide(&leaf, shape, parent_bit).unwrap();
        assert_eq!(inner.discriminating_bit(), 4);

        let mut collected = Vec::new();
        for pos in ALL_INNER_POSITIONS {
            let child_offsets = inner.child_offsets(pos, &Offset::default());
            let child_shape = inner.child_shape(pos, &shape);
            if let TreeNode::Leaf(shadow) = inner.child(pos) {
                for (row, col, value) in shadow.tuples() {
                    assert!(row >= 0 && row < child_shape.nrows);
                    assert!(col >= 0 && col < child_shape.ncols);
                    collected.push((
                        row + child_offsets.row_offset,
                        col + child_offsets.col_offset,
                        value,
                    ));
                }
            }
        }
        collected.sort_unstable_by_key(|&(r, c, _)| (c, r));
        let mut expected = kepner_gilbert_tuples();
        expected.sort_unstable_by_key(|&(r, c, _)| (c, r));
        assert_eq!(collected, expected);
    }

    #[test]
    fn one_sided_leaf_leaves_the_other_side_empty() {
        // all tuples in the west columns
        let shape = Shape { nrows: 8, ncols: 8 };
        let leaf = single_leaf(vec![(0, 0, 1.0), (5, 1, 2.0), (7, 3, 3.0)], shape);
        let parent_bit = SingleBlockContainer::<f64>::discriminating_bit_for(&shape);

        let inner = shadow_subdivide(&leaf, shape, parent_bit).unwrap();
        assert!(inner.child(InnerPosition::Ne).is_empty());
        assert!(inner.child(InnerPosition::Se).is_empty());
        assert!(!inner.child(InnerPosition::Nw).is_empty());
        assert!(!inner.child(InnerPosition::Sw).is_empty());
    }
}
