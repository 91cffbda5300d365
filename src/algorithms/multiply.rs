//! The recursive multiply planner.
//!
//! A destination cell of the product is described by a *pair set*: the
//! `(a, b)` node pairs whose products sum into that cell. Pair sets are
//! classified by a status bitfield, pruned of empty pairs, and either
//! dispatched to the leaf kernel or recursed four ways, shadow-subdividing
//! any leaf that is aligned against an inner block.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use log::debug;

use crate::algorithms::dcsc_accumulator::DcscAccumulator;
use crate::algorithms::multiply_leaves::multiply_leaf_pair;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::{Task, TaskQueue};
use crate::matrix::Matrix;
use crate::quadtree::inner::{ALL_INNER_POSITIONS, InnerBlock, InnerPosition};
use crate::quadtree::node::{LeafBlock, LeafIndex, LeafIndexKind, TreeNode, leaf_index_kind};
use crate::quadtree::shadow_subdivision::shadow_subdivide;
use crate::semiring::Semiring;
use crate::types::{Index, Offset, Shape};

/// One or both nodes are empty; the pair contributes nothing.
pub const HAS_EMPTY: u32 = 1;
/// One or both nodes are future blocks; the computation cannot proceed.
pub const HAS_FUTURE: u32 = 1 << 1;
/// One or both nodes are inner blocks; recursion is required.
pub const HAS_INNER: u32 = 1 << 2;
/// One or both nodes are leaves.
pub const HAS_LEAF: u32 = 1 << 3;
/// The pair's dimensions do not line up. Should never survive planning.
pub const HAS_MISMATCHED_DIMS: u32 = 1 << 7;

/// Two nodes whose product contributes to one destination cell, along with
/// their shapes and their parents' discriminating bits.
struct NodePair<S: Semiring> {
    a: TreeNode<S::MapA>,
    b: TreeNode<S::MapB>,
    a_shape: Shape,
    b_shape: Shape,
    a_parent_discriminating_bit: Index,
    b_parent_discriminating_bit: Index,
}

fn node_status<T>(node: &TreeNode<T>) -> u32 {
    match node {
        TreeNode::Empty => HAS_EMPTY,
        TreeNode::Future(_) => HAS_FUTURE,
        TreeNode::Inner(_) => HAS_INNER,
        TreeNode::Leaf(_) => HAS_LEAF,
    }
}

impl<S: Semiring> NodePair<S> {
    fn status(&self) -> u32 {
        if self.a_shape.ncols != self.b_shape.nrows {
            return HAS_MISMATCHED_DIMS;
        }
        node_status(&self.a) | node_status(&self.b)
    }
}

/// The pairs that sum into one destination cell.
struct PairSet<S: Semiring> {
    pairs: Vec<NodePair<S>>,
}

impl<S: Semiring> PairSet<S> {
    fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Drop pairs that multiply to nothing. Returns the OR of the remaining
    /// statuses; zero means the destination cell is empty.
    fn prune_empty(&mut self) -> u32 {
        let mut status = 0;
        self.pairs.retain(|pair| {
            let pair_status = pair.status();
            if pair_status & HAS_EMPTY != 0 {
                false
            } else {
                status |= pair_status;
                true
            }
        });
        status
    }

    /// OR of the parents' discriminating bits on each side.
    fn parent_discriminating_bits(&self) -> (Index, Index) {
        self.pairs.iter().fold((0, 0), |(a, b), pair| {
            (a | pair.a_parent_discriminating_bit, b | pair.b_parent_discriminating_bit)
        })
    }
}

/// A unit of multiply work: produce the tree node for one destination cell.
struct MultiplyJob<S: Semiring> {
    pair_set: PairSet<S>,
    dest_offsets: Offset,
    dest_shape: Shape,
    /// Discriminating bit of the container the result lands in; recursion
    /// stops subdividing once the input bits reach it.
    dest_discriminating_bit: Index,
    semiring: S,
    config: Config,
}

impl<S: Semiring + Clone> MultiplyJob<S> {
    fn run(mut self) -> Result<TreeNode<S::Reduce>> {
        let status = self.pair_set.prune_empty();

        if status == 0 {
            return Ok(TreeNode::Empty);
        }
        if status & HAS_MISMATCHED_DIMS != 0 {
            return Err(Error::NodeTypeMismatch("pair dimensions do not line up".into()));
        }
        if status & HAS_FUTURE != 0 {
            return Err(Error::NotImplemented("waiting on future blocks".into()));
        }
        if self.dest_shape.nrows <= 0 || self.dest_shape.ncols <= 0 {
            return Err(Error::NodeTypeMismatch(format!(
                "destination shape {} has a non-positive dimension",
                self.dest_shape
            )));
        }
        if status & HAS_INNER != 0 {
            return self.recurse();
        }
        self.multiply_leaves()
    }

    /// At least one pair has an inner block: split every pair four ways and
    /// either subdivide the destination or merge everything into one job.
    fn recurse(self) -> Result<TreeNode<S::Reduce>> {
        let mut quadrant_sets =
            [PairSet::new(), PairSet::new(), PairSet::new(), PairSet::new()];

        for pair in &self.pair_set.pairs {
            match (&pair.a, &pair.b) {
                (TreeNode::Inner(a), TreeNode::Inner(b)) => {
                    emit_quadrant_products(&mut quadrant_sets, a, b, pair);
                }
                (TreeNode::Inner(a), TreeNode::Leaf(b_leaf)) => {
                    let b = shadow_subdivide(b_leaf, pair.b_shape, pair.b_parent_discriminating_bit)?;
                    emit_quadrant_products(&mut quadrant_sets, a, &b, pair);
                }
                (TreeNode::Leaf(a_leaf), TreeNode::Inner(b)) => {
                    let a = shadow_subdivide(a_leaf, pair.a_shape, pair.a_parent_discriminating_bit)?;
                    emit_quadrant_products(&mut quadrant_sets, &a, b, pair);
                }
                // two leaves forced to recurse by another pair in this set
                (TreeNode::Leaf(a_leaf), TreeNode::Leaf(b_leaf)) => {
                    let a = shadow_subdivide(a_leaf, pair.a_shape, pair.a_parent_discriminating_bit)?;
                    let b = shadow_subdivide(b_leaf, pair.b_shape, pair.b_parent_discriminating_bit)?;
                    emit_quadrant_products(&mut quadrant_sets, &a, &b, pair);
                }
                // empties contribute nothing; futures were rejected above
                (TreeNode::Empty, _) | (_, TreeNode::Empty) => {}
                (TreeNode::Future(_), _) | (_, TreeNode::Future(_)) => {}
            }
        }

        let (a_parent_bit, _b_parent_bit) = self.pair_set.parent_discriminating_bits();
        let a_child_bit = a_parent_bit >> 1;

        if a_child_bit >= self.dest_discriminating_bit {
            // The inputs subdivide but the result should not: for example a
            // short-fat times tall-skinny product whose result fits in one
            // cell. Merge the quadrant sets and retry against the same slot.
            let mut merged = PairSet::new();
            for set in quadrant_sets {
                merged.pairs.extend(set.pairs);
            }
            let job = MultiplyJob {
                pair_set: merged,
                dest_offsets: self.dest_offsets,
                dest_shape: self.dest_shape,
                dest_discriminating_bit: self.dest_discriminating_bit,
                semiring: self.semiring.clone(),
                config: self.config.clone(),
            };
            return job.run();
        }

        let child_bit = self.dest_discriminating_bit >> 1;
        let mut children =
            [TreeNode::Empty, TreeNode::Empty, TreeNode::Empty, TreeNode::Empty];
        for (pos, set) in ALL_INNER_POSITIONS.into_iter().zip(quadrant_sets) {
            let job = MultiplyJob {
                pair_set: set,
                dest_offsets: InnerBlock::<S::Reduce>::child_offsets_for(
                    child_bit,
                    pos,
                    &self.dest_offsets,
                ),
                dest_shape: InnerBlock::<S::Reduce>::child_shape_for(
                    child_bit,
                    pos,
                    &self.dest_shape,
                ),
                dest_discriminating_bit: child_bit,
                semiring: self.semiring.clone(),
                config: self.config.clone(),
            };
            children[pos as usize] = job.run()?;
        }

        // keep the tree canonical: an all-empty inner block is just empty
        if children.iter().all(TreeNode::is_empty) {
            return Ok(TreeNode::Empty);
        }
        Ok(TreeNode::Inner(Arc::new(InnerBlock::new(child_bit, children)?)))
    }

    /// Only leaves remain: multiply every pair and sum the partial products.
    fn multiply_leaves(self) -> Result<TreeNode<S::Reduce>> {
        match leaf_index_kind(&self.dest_shape) {
            LeafIndexKind::I16 => self.multiply_leaves_as::<i16>(),
            LeafIndexKind::I32 => self.multiply_leaves_as::<i32>(),
            LeafIndexKind::I64 => self.multiply_leaves_as::<i64>(),
        }
    }

    fn multiply_leaves_as<RetIT: LeafIndex>(self) -> Result<TreeNode<S::Reduce>> {
        let mut accumulator = DcscAccumulator::<RetIT, S::Reduce>::new(self.dest_shape);

        for pair in &self.pair_set.pairs {
            let (TreeNode::Leaf(a), TreeNode::Leaf(b)) = (&pair.a, &pair.b) else {
                return Err(Error::NodeTypeMismatch(
                    "leaf multiply reached a non-leaf pair".into(),
                ));
            };
            accumulator.add(multiply_leaf_pair::<RetIT, S>(
                a,
                b,
                &self.dest_shape,
                &self.semiring,
                &self.config,
            ));
        }

        let result = accumulator.collapse(&self.semiring, &self.config);
        if result.nnn() > 0 {
            Ok(TreeNode::Leaf(RetIT::leaf_node(LeafBlock::Dcsc(result))))
        } else {
            Ok(TreeNode::Empty)
        }
    }
}

/// The eight-way quadrant product of two inner blocks:
///
///   C.NW = A.NW*B.NW + A.NE*B.SW      C.NE = A.NW*B.NE + A.NE*B.SE
///   C.SW = A.SW*B.NW + A.SE*B.SW      C.SE = A.SW*B.NE + A.SE*B.SE
fn emit_quadrant_products<S: Semiring>(
    quadrant_sets: &mut [PairSet<S>; 4],
    a: &Arc<InnerBlock<S::MapA>>,
    b: &Arc<InnerBlock<S::MapB>>,
    pair: &NodePair<S>,
) {
    use InnerPosition::*;
    let products: [(InnerPosition, InnerPosition, InnerPosition); 8] = [
        (Nw, Nw, Nw),
        (Nw, Ne, Sw),
        (Ne, Nw, Ne),
        (Ne, Ne, Se),
        (Sw, Sw, Nw),
        (Sw, Se, Sw),
        (Se, Sw, Ne),
        (Se, Se, Se),
    ];

    for (dest, a_pos, b_pos) in products {
        quadrant_sets[dest as usize].pairs.push(NodePair {
            a: a.child(a_pos).clone(),
            b: b.child(b_pos).clone(),
            a_shape: a.child_shape(a_pos, &pair.a_shape),
            b_shape: b.child_shape(b_pos, &pair.b_shape),
            a_parent_discriminating_bit: a.discriminating_bit(),
            b_parent_discriminating_bit: b.discriminating_bit(),
        });
    }
}

/// Root multiply task handed to the task queue; writes its result into a
/// shared destination cell.
struct MultiplyTask<S: Semiring> {
    job: Option<MultiplyJob<S>>,
    dest: Rc<RefCell<TreeNode<S::Reduce>>>,
}

impl<S> Task for MultiplyTask<S>
where
    S: Semiring + Clone + 'static,
    S::MapA: 'static,
    S::MapB: 'static,
    S::Reduce: 'static,
{
    fn priority(&self) -> i64 {
        self.job
            .as_ref()
            .map_or(0, |job| job.dest_offsets.row_offset + job.dest_offsets.col_offset)
    }

    fn execute(&mut self, _queue: &mut TaskQueue) -> Result<()> {
        if let Some(job) = self.job.take() {
            *self.dest.borrow_mut() = job.run()?;
        }
        Ok(())
    }
}

/// Multiply two matrices over a semiring: `C = A * B` with shape
/// `{A.nrows, B.ncols}`.
pub fn multiply<S>(
    a: &Matrix<S::MapA>,
    b: &Matrix<S::MapB>,
    semiring: &S,
    config: &Config,
) -> Result<Matrix<S::Reduce>>
where
    S: Semiring + Clone + 'static,
    S::MapA: 'static,
    S::MapB: 'static,
    S::Reduce: 'static,
{
    let result_shape = Shape { nrows: a.shape().nrows, ncols: b.shape().ncols };
    debug!("multiplying {} by {} into {result_shape}", a.shape(), b.shape());

    let root_pair = NodePair {
        a: a.root_node().clone(),
        b: b.root_node().clone(),
        a_shape: a.shape(),
        b_shape: b.shape(),
        a_parent_discriminating_bit: a.root_discriminating_bit(),
        b_parent_discriminating_bit: b.root_discriminating_bit(),
    };
    let job = MultiplyJob {
        pair_set: PairSet { pairs: vec![root_pair] },
        dest_offsets: Offset::default(),
        dest_shape: result_shape,
        dest_discriminating_bit: Matrix::<S::Reduce>::root_discriminating_bit_for(&result_shape),
        semiring: semiring.clone(),
        config: config.clone(),
    };

    let dest = Rc::new(RefCell::new(TreeNode::Empty));
    let mut queue = TaskQueue::new();
    queue.enqueue(Box::new(MultiplyTask { job: Some(job), dest: Rc::clone(&dest) }))?;

    let root = Rc::try_unwrap(dest).map(RefCell::into_inner).unwrap_or(TreeNode::Empty);
    Ok(Matrix::from_node(result_shape, root))
}
