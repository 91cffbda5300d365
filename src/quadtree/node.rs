//! The quadtree node sum type and the leaf index width machinery.

use std::fmt::Debug;
use std::sync::Arc;

use crate::quadtree::columns::{ColumnView, RawRows, Tuples};
use crate::quadtree::dcsc::{DcscBlock, DcscColumns};
use crate::quadtree::inner::InnerBlock;
use crate::quadtree::window_shadow::{ShadowBase, ShadowColumns, WindowShadowBlock};
use crate::types::{BlockNnn, BlockSizeInfo, Index, Offset, Shape};

/// Index type used inside one leaf block.
///
/// Most blocks have small dimensions even when the whole matrix is huge, so
/// leaves store row/column indices at the narrowest width that can address
/// their shape. Everything outside a leaf speaks `Index`.
pub trait LeafIndex: Copy + Ord + Debug + Send + Sync + 'static {
    const MAX_DIM: Index;

    /// Narrow a matrix-local index. The caller guarantees the value fits,
    /// which holds whenever the value addresses a shape this width was
    /// selected for.
    fn from_index(value: Index) -> Self;

    fn to_index(self) -> Index;

    fn leaf_node<T>(block: LeafBlock<Self, T>) -> LeafNode<T>;

    fn shadow_base<T>(block: Arc<DcscBlock<Self, T>>) -> ShadowBase<T>;

    fn raw_rows(rows: &[Self]) -> RawRows<'_>;
}

macro_rules! impl_leaf_index {
    ($ty:ty, $node:ident, $base:ident, $raw:ident) => {
        impl LeafIndex for $ty {
            const MAX_DIM: Index = <$ty>::MAX as Index;

            fn from_index(value: Index) -> Self {
                debug_assert!(value <= Self::MAX_DIM);
                value as $ty
            }

            fn to_index(self) -> Index {
                self as Index
            }

            fn leaf_node<T>(block: LeafBlock<Self, T>) -> LeafNode<T> {
                LeafNode::$node(block)
            }

            fn shadow_base<T>(block: Arc<DcscBlock<Self, T>>) -> ShadowBase<T> {
                ShadowBase::$base(block)
            }

            fn raw_rows(rows: &[Self]) -> RawRows<'_> {
                RawRows::$raw(rows)
            }
        }
    };
}

impl_leaf_index!(i16, I16, I16, I16);
impl_leaf_index!(i32, I32, I32, I32);
impl_leaf_index!(i64, I64, I64, I64);

/// The three supported leaf index widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafIndexKind {
    I16,
    I32,
    I64,
}

/// The narrowest index width that can address `shape`.
pub fn leaf_index_kind(shape: &Shape) -> LeafIndexKind {
    let dim = shape.nrows.max(shape.ncols);
    if dim <= i16::MAX_DIM {
        LeafIndexKind::I16
    } else if dim <= i32::MAX_DIM {
        LeafIndexKind::I32
    } else {
        LeafIndexKind::I64
    }
}

/// Placeholder for a subtree that has not been computed yet. Nothing in the
/// crate produces one; consumers error out when they meet one.
#[derive(Debug, Default)]
pub struct FutureBlock;

/// A quadtree node. Value-like: cloning shares the underlying blocks.
#[derive(Debug, Clone, Default)]
pub enum TreeNode<T> {
    #[default]
    Empty,
    Future(Arc<FutureBlock>),
    Inner(Arc<InnerBlock<T>>),
    Leaf(LeafNode<T>),
}

impl<T> TreeNode<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, TreeNode::Empty)
    }
}

/// A leaf node, tagged by its index width. Leaves of the same width
/// inter-operate directly in the kernels.
#[derive(Debug, Clone)]
pub enum LeafNode<T> {
    I16(LeafBlock<i16, T>),
    I32(LeafBlock<i32, T>),
    I64(LeafBlock<i64, T>),
}

/// One concrete leaf: either an owning DCSC block or a non-owning window
/// shadow over some owning leaf.
#[derive(Debug)]
pub enum LeafBlock<IT, T> {
    Dcsc(Arc<DcscBlock<IT, T>>),
    Shadow(Arc<WindowShadowBlock<IT, T>>),
}

impl<IT, T> Clone for LeafBlock<IT, T> {
    fn clone(&self) -> Self {
        match self {
            LeafBlock::Dcsc(b) => LeafBlock::Dcsc(Arc::clone(b)),
            LeafBlock::Shadow(b) => LeafBlock::Shadow(Arc::clone(b)),
        }
    }
}

impl<IT: LeafIndex, T: Copy> LeafBlock<IT, T> {
    pub fn nnn(&self) -> BlockNnn {
        match self {
            LeafBlock::Dcsc(b) => b.nnn(),
            LeafBlock::Shadow(b) => b.nnn(),
        }
    }

    pub fn get_column(&self, col: Index) -> Option<ColumnView<'_, T>> {
        match self {
            LeafBlock::Dcsc(b) => b.get_column(col),
            LeafBlock::Shadow(b) => b.get_column(col),
        }
    }

    pub fn size_info(&self) -> BlockSizeInfo {
        match self {
            LeafBlock::Dcsc(b) => b.size_info(),
            LeafBlock::Shadow(b) => b.size_info(),
        }
    }

    /// Window a rectangle of this leaf as a new shadow leaf with local
    /// coordinates. Shadowing a shadow references the owning leaf directly.
    pub fn shadow(&self, offsets: Offset, shape: Shape) -> LeafNode<T> {
        match self {
            LeafBlock::Dcsc(b) => DcscBlock::shadow(b, offsets, shape),
            LeafBlock::Shadow(b) => b.shadow(offsets, shape),
        }
    }

    /// Positions of this block's column range within the owning column array.
    pub(crate) fn column_range(&self) -> (usize, usize) {
        match self {
            LeafBlock::Dcsc(b) => (0, b.num_columns()),
            LeafBlock::Shadow(b) => b.column_position_range(),
        }
    }

    /// Position of the first column at or above the local column `col`,
    /// comparable with `column_range`.
    pub(crate) fn column_division(&self, col: Index) -> usize {
        match self {
            LeafBlock::Dcsc(b) => b.column_lower_bound(col),
            LeafBlock::Shadow(b) => b.column_lower_bound(col),
        }
    }
}

/// Column iterator over any leaf flavor.
pub enum LeafColumns<'a, T> {
    Dcsc16(DcscColumns<'a, i16, T>),
    Dcsc32(DcscColumns<'a, i32, T>),
    Dcsc64(DcscColumns<'a, i64, T>),
    Shadow(ShadowColumns<'a, T>),
}

impl<'a, T: Copy> Iterator for LeafColumns<'a, T> {
    type Item = ColumnView<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            LeafColumns::Dcsc16(it) => it.next(),
            LeafColumns::Dcsc32(it) => it.next(),
            LeafColumns::Dcsc64(it) => it.next(),
            LeafColumns::Shadow(it) => it.next(),
        }
    }
}

pub type LeafTuples<'a, T> = Tuples<'a, T, LeafColumns<'a, T>>;

impl<T: Copy> LeafNode<T> {
    pub fn nnn(&self) -> BlockNnn {
        match self {
            LeafNode::I16(b) => b.nnn(),
            LeafNode::I32(b) => b.nnn(),
            LeafNode::I64(b) => b.nnn(),
        }
    }

    /// Columns in ascending column order, rows ascending within each column.
    pub fn columns(&self) -> LeafColumns<'_, T> {
        match self {
            LeafNode::I16(LeafBlock::Dcsc(b)) => LeafColumns::Dcsc16(b.columns()),
            LeafNode::I32(LeafBlock::Dcsc(b)) => LeafColumns::Dcsc32(b.columns()),
            LeafNode::I64(LeafBlock::Dcsc(b)) => LeafColumns::Dcsc64(b.columns()),
            LeafNode::I16(LeafBlock::Shadow(b)) => LeafColumns::Shadow(b.columns()),
            LeafNode::I32(LeafBlock::Shadow(b)) => LeafColumns::Shadow(b.columns()),
            LeafNode::I64(LeafBlock::Shadow(b)) => LeafColumns::Shadow(b.columns()),
        }
    }

    pub fn get_column(&self, col: Index) -> Option<ColumnView<'_, T>> {
        match self {
            LeafNode::I16(b) => b.get_column(col),
            LeafNode::I32(b) => b.get_column(col),
            LeafNode::I64(b) => b.get_column(col),
        }
    }

    pub fn size_info(&self) -> BlockSizeInfo {
        match self {
            LeafNode::I16(b) => b.size_info(),
            LeafNode::I32(b) => b.size_info(),
            LeafNode::I64(b) => b.size_info(),
        }
    }

    /// `(row, col, value)` tuples in column-major ascending order.
    pub fn tuples(&self) -> LeafTuples<'_, T> {
        Tuples::new(self.columns())
    }

    pub fn shadow(&self, offsets: Offset, shape: Shape) -> LeafNode<T> {
        match self {
            LeafNode::I16(b) => b.shadow(offsets, shape),
            LeafNode::I32(b) => b.shadow(offsets, shape),
            LeafNode::I64(b) => b.shadow(offsets, shape),
        }
    }

    pub(crate) fn column_range(&self) -> (usize, usize) {
        match self {
            LeafNode::I16(b) => b.column_range(),
            LeafNode::I32(b) => b.column_range(),
            LeafNode::I64(b) => b.column_range(),
        }
    }

    pub(crate) fn column_division(&self, col: Index) -> usize {
        match self {
            LeafNode::I16(b) => b.column_division(col),
            LeafNode::I32(b) => b.column_division(col),
            LeafNode::I64(b) => b.column_division(col),
        }
    }
}
