//! Column-wise summation of DCSC leaves of identical shape.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::algorithms::spa::Spa;
use crate::config::Config;
use crate::quadtree::dcsc::{DcscBlock, DcscBuilder};
use crate::quadtree::node::LeafIndex;
use crate::semiring::Semiring;
use crate::types::{Index, Shape};

/// Collects partial-product leaves destined for the same cell and merges
/// them into one leaf. Inputs are not mutated.
pub struct DcscAccumulator<IT, T> {
    shape: Shape,
    children: Vec<Arc<DcscBlock<IT, T>>>,
}

/// Cursor over one child's columns; the heap orders cursors by their current
/// column, ties broken by child position for stability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct ColumnCursor {
    col: Index,
    child: usize,
    pos: usize,
}

impl<IT: LeafIndex, T: Copy> DcscAccumulator<IT, T> {
    pub fn new(shape: Shape) -> Self {
        Self { shape, children: Vec::new() }
    }

    pub fn add(&mut self, block: Arc<DcscBlock<IT, T>>) {
        self.children.push(block);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Merge all collected leaves. Duplicate `(row, col)` entries across
    /// inputs combine through `semiring.add`; output columns are ascending.
    pub fn collapse<S>(mut self, semiring: &S, config: &Config) -> Arc<DcscBlock<IT, T>>
    where
        S: Semiring<Reduce = T>,
    {
        if self.children.len() == 1 {
            if let Some(only) = self.children.pop() {
                return only;
            }
        }

        let estimated_flops: i64 = self.children.iter().map(|c| c.nnn() as i64).sum();
        let mut spa =
            Spa::choose_with_flops(self.shape.nrows, estimated_flops as f64, semiring, config);
        let mut builder = DcscBuilder::new();

        let mut heap: BinaryHeap<Reverse<ColumnCursor>> = BinaryHeap::new();
        for (child, block) in self.children.iter().enumerate() {
            if block.num_columns() > 0 {
                heap.push(Reverse(ColumnCursor { col: block.col_index_at(0), child, pos: 0 }));
            }
        }

        while let Some(Reverse(cursor)) = heap.pop() {
            let block = &self.children[cursor.child];
            spa.scatter(&block.column_at(cursor.pos));

            // last contributor to this column? then the column is complete
            let column_complete = match heap.peek() {
                None => true,
                Some(Reverse(next)) => next.col > cursor.col,
            };
            if column_complete {
                builder.add_column_from_spa(IT::from_index(cursor.col), &mut spa);
                spa.clear();
            }

            let next_pos = cursor.pos + 1;
            if next_pos < block.num_columns() {
                heap.push(Reverse(ColumnCursor {
                    col: block.col_index_at(next_pos),
                    child: cursor.child,
                    pos: next_pos,
                }));
            }
        }

        builder.finish_shared(config)
    }
}
