//! Conversion of a triples bag into a balanced quadtree.
//!
//! The triples arrays are shared by the whole recursion; only an index
//! permutation is partitioned and narrowed, so subdivision costs no extra
//! tuple storage.

use std::sync::Arc;

use log::trace;

use crate::config::Config;
use crate::error::Result;
use crate::quadtree::dcsc::DcscBuilder;
use crate::quadtree::inner::{InnerBlock, InnerPosition};
use crate::quadtree::node::{
    LeafBlock, LeafIndex, LeafIndexKind, LeafNode, TreeNode, leaf_index_kind,
};
use crate::quadtree::triples::TriplesBlock;
use crate::types::{Index, Offset, Shape, child_discriminating_bit, discriminating_bit};

/// Build a quadtree from a triples block. No leaf of the result holds
/// `config.leaf_split_threshold` tuples or more.
pub fn subdivide<T: Copy>(
    block: &TriplesBlock<T>,
    shape: Shape,
    config: &Config,
) -> Result<TreeNode<T>> {
    trace!("subdividing {} tuples over {shape}", block.len());
    let mut perm: Vec<usize> = (0..block.len()).collect();
    subdivide_range(
        block,
        Offset::default(),
        shape,
        discriminating_bit(&shape) << 1,
        &mut perm,
        config,
    )
}

fn subdivide_range<T: Copy>(
    block: &TriplesBlock<T>,
    offsets: Offset,
    shape: Shape,
    parent_discriminating_bit: Index,
    perm: &mut [usize],
    config: &Config,
) -> Result<TreeNode<T>> {
    if perm.is_empty() {
        return Ok(TreeNode::Empty);
    }

    if perm.len() < config.leaf_split_threshold {
        block.sort_permutation_range(perm);
        return Ok(TreeNode::Leaf(build_leaf(block, offsets, shape, perm, config)));
    }

    let d = child_discriminating_bit(parent_discriminating_bit);

    // split east/west by column, then north/south by row within each half
    let ew = partition_in_place(perm, |i| block.col(i) - offsets.col_offset < d);
    let (west, east) = perm.split_at_mut(ew);
    let ns_west = partition_in_place(west, |i| block.row(i) - offsets.row_offset < d);
    let ns_east = partition_in_place(east, |i| block.row(i) - offsets.row_offset < d);
    let (nw, sw) = west.split_at_mut(ns_west);
    let (ne, se) = east.split_at_mut(ns_east);

    let child = |pos: InnerPosition, quadrant_perm: &mut [usize]| {
        subdivide_range(
            block,
            InnerBlock::<T>::child_offsets_for(d, pos, &offsets),
            InnerBlock::<T>::child_shape_for(d, pos, &shape),
            d,
            quadrant_perm,
            config,
        )
    };

    let children = [
        child(InnerPosition::Nw, nw)?,
        child(InnerPosition::Ne, ne)?,
        child(InnerPosition::Sw, sw)?,
        child(InnerPosition::Se, se)?,
    ];

    Ok(TreeNode::Inner(Arc::new(InnerBlock::new(d, children)?)))
}

/// Move indices satisfying `pred` to the front; returns the split point.
fn partition_in_place(perm: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut split = 0;
    for i in 0..perm.len() {
        if pred(perm[i]) {
            perm.swap(split, i);
            split += 1;
        }
    }
    split
}

/// Build a single DCSC leaf from a `(col, row)`-sorted permutation range,
/// rebasing coordinates to the leaf and picking the index width from the
/// leaf shape.
fn build_leaf<T: Copy>(
    block: &TriplesBlock<T>,
    offsets: Offset,
    shape: Shape,
    perm: &[usize],
    config: &Config,
) -> LeafNode<T> {
    match leaf_index_kind(&shape) {
        LeafIndexKind::I16 => {
            LeafNode::I16(LeafBlock::Dcsc(build_dcsc::<i16, T>(block, offsets, perm, config)))
        }
        LeafIndexKind::I32 => {
            LeafNode::I32(LeafBlock::Dcsc(build_dcsc::<i32, T>(block, offsets, perm, config)))
        }
        LeafIndexKind::I64 => {
            LeafNode::I64(LeafBlock::Dcsc(build_dcsc::<i64, T>(block, offsets, perm, config)))
        }
    }
}

fn build_dcsc<IT: LeafIndex, T: Copy>(
    block: &TriplesBlock<T>,
    offsets: Offset,
    perm: &[usize],
    config: &Config,
) -> Arc<crate::quadtree::dcsc::DcscBlock<IT, T>> {
    let mut builder = DcscBuilder::with_capacity(perm.len());
    for &i in perm {
        builder.push(
            IT::from_index(block.row(i) - offsets.row_offset),
            IT::from_index(block.col(i) - offsets.col_offset),
            block.value(i),
        );
    }
    builder.finish_shared(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadtree::inner::ALL_INNER_POSITIONS as POSITIONS;
    use crate::test_util::kepner_gilbert_tuples;
    use crate::types::BlockNnn;

    fn collect_tuples<T: Copy>(
        node: &TreeNode<T>,
        offsets: Offset,
        shape: Shape,
        out: &mut Vec<(Index, Index, T)>,
    ) {
        match node {
            TreeNode::Empty | TreeNode::Future(_) => {}
            TreeNode::Inner(inner) => {
                for pos in POSITIONS {
                    collect_tuples(
                        inner.child(pos),
                        inner.child_offsets(pos, &offsets),
                        inner.child_shape(pos, &shape),
                        out,
                    );
                }
            }
            TreeNode::Leaf(leaf) => {
                for (row, col, value) in leaf.tuples() {
                    assert!(row < shape.nrows && col < shape.ncols, "tuple outside leaf shape");
                    out.push((row + offsets.row_offset, col + offsets.col_offset, value));
                }
            }
        }
    }

    fn leaf_sizes<T: Copy>(node: &TreeNode<T>, out: &mut Vec<BlockNnn>) {
        match node {
            TreeNode::Empty | TreeNode::Future(_) => {}
            TreeNode::Inner(inner) => {
                for child in inner.children() {
                    leaf_sizes(child, out);
                }
            }
            TreeNode::Leaf(leaf) => out.push(leaf.nnn()),
        }
    }

    fn check_bits<T: Copy>(node: &TreeNode<T>, expected: Index) {
        if let TreeNode::Inner(inner) = node {
            assert_eq!(inner.discriminating_bit(), expected);
            for child in inner.children() {
                check_bits(child, child_discriminating_bit(expected));
            }
        }
    }

    #[test]
    fn no_triples_yields_empty() {
        let block: TriplesBlock<f64> = TriplesBlock::new();
        let node = subdivide(&block, Shape { nrows: 10, ncols: 10 }, &Config::default()).unwrap();
        assert!(node.is_empty());
    }

    #[test]
    fn small_input_yields_single_leaf() {
        let mut block = TriplesBlock::new();
        block.extend(kepner_gilbert_tuples());
        let node = subdivide(&block, Shape { nrows: 7, ncols: 7 }, &Config::default()).unwrap();
        let TreeNode::Leaf(leaf) = &node else { panic!("expected a leaf") };
        assert_eq!(leaf.nnn(), 12);
    }

    #[test]
    fn split_threshold_bounds_every_leaf() {
        let config = Config { leaf_split_threshold: 4, ..Config::default() };
        let mut block = TriplesBlock::new();
        block.extend(kepner_gilbert_tuples());
        let shape = Shape { nrows: 7, ncols: 7 };
        let node = subdivide(&block, shape, &config).unwrap();

        let mut sizes = Vec::new();
        leaf_sizes(&node, &mut sizes);
        assert!(!sizes.is_empty());
        for nnn in sizes {
            assert!(nnn > 0 && nnn <= 4, "leaf size {nnn} out of bounds");
        }

        let mut tuples = Vec::new();
        collect_tuples(&node, Offset::default(), shape, &mut tuples);
        tuples.sort_unstable_by_key(|&(r, c, _)| (c, r));
        let mut expected = kepner_gilbert_tuples();
        expected.sort_unstable_by_key(|&(r, c, _)| (c, r));
        assert_eq!(tuples, expected);
    }

    #[test]
    fn discriminating_bits_halve_down_the_tree() {
        let config = Config { leaf_split_threshold: 2, ..Config::default() };
        let mut block = TriplesBlock::new();
        block.extend(kepner_gilbert_tuples());
        let shape = Shape { nrows: 7, ncols: 7 };
        let node = subdivide(&block, shape, &config).unwrap();
        // root inner splits a 7x7 shape at 4
        check_bits(&node, 4);
    }

    #[test]
    fn partition_moves_matching_indices_first() {
        let mut perm = vec![0, 1, 2, 3, 4, 5];
        let split = partition_in_place(&mut perm, |i| i % 2 == 0);
        assert_eq!(split, 3);
        let (evens, odds) = perm.split_at(split);
        assert!(evens.iter().all(|i| i % 2 == 0));
        assert!(odds.iter().all(|i| i % 2 == 1));
    }
}
