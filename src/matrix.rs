use log::trace;

use crate::config::Config;
use crate::error::Result;
use crate::quadtree::container::SingleBlockContainer;
use crate::quadtree::inner::ALL_INNER_POSITIONS;
use crate::quadtree::node::{LeafNode, TreeNode};
use crate::quadtree::subdivide::subdivide;
use crate::quadtree::triples::TriplesBlock;
use crate::types::{BlockSizeInfo, Index, Offset, Shape};

/// A sparse matrix backed by a quadtree of blocks.
#[derive(Debug, Clone)]
pub struct Matrix<T> {
    root: SingleBlockContainer<T>,
}

impl<T: Copy> Matrix<T> {
    /// An empty matrix of the given shape.
    pub fn new(shape: Shape) -> Self {
        Self { root: SingleBlockContainer::new(shape) }
    }

    /// A matrix over an existing tree.
    pub fn from_node(shape: Shape, node: TreeNode<T>) -> Self {
        Self { root: SingleBlockContainer::with_node(shape, node) }
    }

    pub fn shape(&self) -> Shape {
        self.root.shape()
    }

    pub fn root_node(&self) -> &TreeNode<T> {
        self.root.node()
    }

    pub(crate) fn into_root_node(self) -> TreeNode<T> {
        self.root.into_node()
    }

    /// Discriminating bit of the root container; one power of two beyond the
    /// largest dimension.
    pub fn root_discriminating_bit(&self) -> Index {
        self.root.discriminating_bit()
    }

    pub fn root_discriminating_bit_for(shape: &Shape) -> Index {
        SingleBlockContainer::<T>::discriminating_bit_for(shape)
    }

    /// Number of stored entries. Walks every block.
    pub fn nnn(&self) -> usize {
        let mut total = 0usize;
        self.for_each_leaf(|leaf, _, _| total += leaf.nnn() as usize);
        total
    }

    /// Aggregate storage of the tree's leaves. Walks every block.
    pub fn size_info(&self) -> BlockSizeInfo {
        let mut total = BlockSizeInfo::default();
        self.for_each_leaf(|leaf, _, _| total = total + leaf.size_info());
        total
    }

    /// Visit every leaf with its matrix-global offsets and shape.
    pub fn for_each_leaf(&self, mut callback: impl FnMut(&LeafNode<T>, Offset, Shape)) {
        visit_leaves(self.root_node(), Offset::default(), self.shape(), &mut callback);
    }

    /// All tuples with matrix-global coordinates, in leaf traversal order.
    pub fn to_tuples(&self) -> Vec<(Index, Index, T)> {
        let mut out = Vec::new();
        self.for_each_leaf(|leaf, offsets, _| {
            for (row, col, value) in leaf.tuples() {
                out.push((row + offsets.row_offset, col + offsets.col_offset, value));
            }
        });
        out
    }
}

fn visit_leaves<T: Copy, F: FnMut(&LeafNode<T>, Offset, Shape)>(
    node: &TreeNode<T>,
    offsets: Offset,
    shape: Shape,
    callback: &mut F,
) {
    match node {
        TreeNode::Empty | TreeNode::Future(_) => {}
        TreeNode::Inner(inner) => {
            for pos in ALL_INNER_POSITIONS {
                visit_leaves(
                    inner.child(pos),
                    inner.child_offsets(pos, &offsets),
                    inner.child_shape(pos, &shape),
                    callback,
                );
            }
        }
        TreeNode::Leaf(leaf) => callback(leaf, offsets, shape),
    }
}

/// Build a matrix from `(row, col, value)` tuples in any order.
pub fn matrix_from_tuples<T: Copy>(
    shape: Shape,
    tuples: impl IntoIterator<Item = (Index, Index, T)>,
    config: &Config,
) -> Result<Matrix<T>> {
    let mut triples = TriplesBlock::new();
    triples.extend(tuples);
    trace!("building {shape} matrix from {} tuples", triples.len());
    let node = subdivide(&triples, shape, config)?;
    Ok(Matrix::from_node(shape, node))
}

/// Renders a small matrix as an aligned text grid; zero cells stay blank.
/// Debug and test helper, quadratic in the shape.
pub struct DenseStringMatrix {
    cells: Vec<Vec<String>>,
    column_widths: Vec<usize>,
}

impl DenseStringMatrix {
    pub fn new(shape: Shape) -> Self {
        Self {
            cells: vec![vec![String::new(); shape.ncols as usize]; shape.nrows as usize],
            column_widths: vec![1; shape.ncols as usize],
        }
    }

    pub fn fill_tuples<T: std::fmt::Display>(
        &mut self,
        tuples: impl IntoIterator<Item = (Index, Index, T)>,
    ) {
        for (row, col, value) in tuples {
            let formatted = format!("{value}");
            self.column_widths[col as usize] =
                self.column_widths[col as usize].max(formatted.len());
            self.cells[row as usize][col as usize] = formatted;
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, row) in self.cells.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let mut line = String::new();
            for (j, cell) in row.iter().enumerate() {
                if j > 0 {
                    line.push(' ');
                }
                line.push_str(&format!("{cell:<width$}", width = self.column_widths[j]));
            }
            out.push_str(line.trim_end());
        }
        out
    }
}
