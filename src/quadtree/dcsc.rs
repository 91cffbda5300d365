use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::quadtree::columns::{ColumnView, RowIndices, Tuples};
use crate::quadtree::node::{LeafIndex, LeafNode};
use crate::quadtree::window_shadow::make_shadow_node;
use crate::semiring::Semiring;
use crate::types::{BlockNnn, BlockSizeInfo, Index, Offset, Shape};

/// A Doubly-Compressed Sparse Column leaf block.
///
/// Like CSC, but the column pointer array is itself compressed: only columns
/// with at least one entry are represented.
/// - `col_ind`: distinct non-empty column indices, ascending, len = k
/// - `col_ptr`: start offsets into the row/value arrays, len = k + 1
/// - `row_ind`: rows within each column, ascending per column, len = nnn
/// - `values`: parallel to `row_ind`
///
/// Two optional acceleration structures speed up `get_column`; at most one
/// is populated and neither is required for correctness.
#[derive(Debug)]
pub struct DcscBlock<IT, T> {
    col_ind: Vec<IT>,
    col_ptr: Vec<BlockNnn>,
    row_ind: Vec<IT>,
    values: Vec<T>,

    /// Column presence bitmask, empty when unused.
    col_mask: Vec<bool>,

    /// Full CSC column pointer array (len `ncols + 1`), empty when unused.
    csc_col_ptr: Vec<BlockNnn>,
}

impl<IT: LeafIndex, T: Copy> DcscBlock<IT, T> {
    pub fn nnn(&self) -> BlockNnn {
        self.values.len() as BlockNnn
    }

    pub fn num_columns(&self) -> usize {
        self.col_ind.len()
    }

    /// Column index at a column position.
    pub fn col_index_at(&self, pos: usize) -> Index {
        self.col_ind[pos].to_index()
    }

    pub fn column_at(&self, pos: usize) -> ColumnView<'_, T> {
        let lo = self.col_ptr[pos] as usize;
        let hi = self.col_ptr[pos + 1] as usize;
        ColumnView {
            col: self.col_ind[pos].to_index(),
            rows: RowIndices::new(IT::raw_rows(&self.row_ind[lo..hi]), 0),
            values: &self.values[lo..hi],
        }
    }

    /// Columns in ascending column order. Random access via `column_at`.
    pub fn columns(&self) -> DcscColumns<'_, IT, T> {
        DcscColumns { block: self, pos: 0 }
    }

    /// `(row, col, value)` tuples in column-major ascending order.
    pub fn tuples(&self) -> Tuples<'_, T, DcscColumns<'_, IT, T>> {
        Tuples::new(self.columns())
    }

    /// Point lookup. Constant time with the CSC index, otherwise a mask test
    /// and/or a binary search over `col_ind`.
    pub fn get_column(&self, col: Index) -> Option<ColumnView<'_, T>> {
        if !self.csc_col_ptr.is_empty() {
            let ncols = self.csc_col_ptr.len() - 1;
            if col < 0 || col as usize >= ncols {
                return None;
            }
            let lo = self.csc_col_ptr[col as usize] as usize;
            let hi = self.csc_col_ptr[col as usize + 1] as usize;
            if lo == hi {
                return None;
            }
            return Some(ColumnView {
                col,
                rows: RowIndices::new(IT::raw_rows(&self.row_ind[lo..hi]), 0),
                values: &self.values[lo..hi],
            });
        }

        if !self.col_mask.is_empty()
            && (col < 0 || col as usize >= self.col_mask.len() || !self.col_mask[col as usize])
        {
            return None;
        }

        let pos = self.col_ind.partition_point(|c| c.to_index() < col);
        if pos == self.col_ind.len() || self.col_ind[pos].to_index() != col {
            return None;
        }
        Some(self.column_at(pos))
    }

    /// Position of the first column with index at or above `col`;
    /// `num_columns()` if there is none.
    pub fn column_lower_bound(&self, col: Index) -> usize {
        self.col_ind.partition_point(|c| c.to_index() < col)
    }

    /// Position one past the last column with index at or below `col`.
    pub fn column_upper_bound(&self, col: Index) -> usize {
        self.col_ind.partition_point(|c| c.to_index() <= col)
    }

    /// Window the rectangle `[offsets.row_offset, +shape.nrows) x
    /// [offsets.col_offset, +shape.ncols)` of this block as a shadow leaf
    /// with local coordinates. No data is copied; the shadow shares
    /// ownership of this block.
    pub fn shadow(this: &Arc<Self>, offsets: Offset, shape: Shape) -> LeafNode<T> {
        let begin = this.column_lower_bound(offsets.col_offset);
        let end = this.column_upper_bound(offsets.col_offset + shape.ncols - 1);
        make_shadow_node(IT::shadow_base(Arc::clone(this)), begin, end, offsets, shape)
    }

    /// Storage used by this block's arrays.
    pub fn size_info(&self) -> BlockSizeInfo {
        BlockSizeInfo {
            index_bytes: self.col_ind.len() * size_of::<IT>()
                + self.row_ind.len() * size_of::<IT>()
                + self.col_ptr.len() * size_of::<BlockNnn>()
                + self.csc_col_ptr.len() * size_of::<BlockNnn>()
                + self.col_mask.len() / 8,
            value_bytes: self.values.len() * size_of::<T>(),
            overhead_bytes: size_of::<Self>(),
            nnn: self.values.len(),
        }
    }

    /// Validate the structural invariants of this block.
    pub fn check_invariants(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidArgument(msg));

        if self.col_ptr.len() != self.col_ind.len() + 1 {
            return invalid(format!(
                "col_ptr length {} does not match {} columns",
                self.col_ptr.len(),
                self.col_ind.len()
            ));
        }
        if self.col_ptr.first().copied().unwrap_or(1) != 0 {
            return invalid("col_ptr does not start at 0".into());
        }
        if self.row_ind.len() != self.values.len() {
            return invalid(format!(
                "row/value length mismatch: {} vs {}",
                self.row_ind.len(),
                self.values.len()
            ));
        }
        if self.col_ptr.last().copied().unwrap_or(-1) as usize != self.row_ind.len() {
            return invalid("col_ptr does not end at nnn".into());
        }
        for w in self.col_ind.windows(2) {
            if w[0] >= w[1] {
                return invalid("col_ind not strictly ascending".into());
            }
        }
        for pos in 0..self.col_ind.len() {
            let (lo, hi) = (self.col_ptr[pos], self.col_ptr[pos + 1]);
            if lo > hi {
                return invalid(format!("col_ptr decreases at column position {pos}"));
            }
            for p in lo..hi {
                if p > lo && self.row_ind[p as usize - 1] >= self.row_ind[p as usize] {
                    return invalid(format!(
                        "rows not strictly ascending in column {:?}",
                        self.col_ind[pos]
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Column iterator over a DCSC block.
#[derive(Debug, Clone)]
pub struct DcscColumns<'a, IT, T> {
    block: &'a DcscBlock<IT, T>,
    pos: usize,
}

impl<'a, IT: LeafIndex, T: Copy> Iterator for DcscColumns<'a, IT, T> {
    type Item = ColumnView<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos < self.block.num_columns() {
            let view = self.block.column_at(self.pos);
            self.pos += 1;
            Some(view)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.block.num_columns() - self.pos;
        (remaining, Some(remaining))
    }
}

impl<IT: LeafIndex, T: Copy> ExactSizeIterator for DcscColumns<'_, IT, T> {}

/// Builds an immutable DCSC block column by column.
///
/// Usage:
///   let mut b = DcscBuilder::new();
///   b.push(row, col, value); ...   // ordered by (col, row)
///   let block = b.finish(&config);
#[derive(Debug)]
pub struct DcscBuilder<IT, T> {
    col_ind: Vec<IT>,
    col_ptr: Vec<BlockNnn>,
    row_ind: Vec<IT>,
    values: Vec<T>,
}

impl<IT: LeafIndex, T: Copy> DcscBuilder<IT, T> {
    pub fn new() -> Self {
        Self { col_ind: Vec::new(), col_ptr: Vec::new(), row_ind: Vec::new(), values: Vec::new() }
    }

    pub fn with_capacity(nnn: usize) -> Self {
        let mut b = Self::new();
        b.row_ind.reserve(nnn);
        b.values.reserve(nnn);
        b
    }

    /// Append one tuple. Tuples must arrive ordered by `(col, row)`.
    pub fn push(&mut self, row: IT, col: IT, value: T) {
        debug_assert!(
            self.col_ind.last().is_none_or(|&c| c <= col),
            "tuples must arrive in column order"
        );
        if self.col_ind.last() != Some(&col) {
            self.col_ind.push(col);
            self.col_ptr.push(self.row_ind.len() as BlockNnn);
        } else {
            debug_assert!(
                self.row_ind.last().is_none_or(|&r| r <= row),
                "rows must arrive ascending within a column"
            );
        }
        self.row_ind.push(row);
        self.values.push(value);
    }

    /// Drain a SpA as the next column. `col` must be greater than any column
    /// added so far. No-op when the SpA is empty.
    pub fn add_column_from_spa<S>(&mut self, col: IT, spa: &mut crate::algorithms::spa::Spa<'_, S>)
    where
        S: Semiring<Reduce = T>,
    {
        if spa.is_empty() {
            return;
        }
        debug_assert!(self.col_ind.last().is_none_or(|&c| c < col));
        self.col_ind.push(col);
        self.col_ptr.push(self.row_ind.len() as BlockNnn);
        spa.gather(&mut self.row_ind, &mut self.values);
    }

    /// Cap the column pointers and build the block, adding the CSC index or
    /// the presence mask when the configuration asks for one. Accepts an
    /// empty builder; the result is then an empty leaf.
    pub fn finish(mut self, config: &Config) -> DcscBlock<IT, T> {
        self.col_ptr.push(self.row_ind.len() as BlockNnn);

        // the acceleration structures cover columns [0, ncols)
        let ncols = self.col_ind.last().map_or(0, |c| c.to_index() + 1);

        let mut csc_col_ptr = Vec::new();
        if ncols > 0 && config.should_use_csc_index(ncols, self.col_ind.len()) {
            csc_col_ptr = vec![0 as BlockNnn; ncols as usize + 1];
            let mut pos = 0usize;
            for (c, slot) in csc_col_ptr.iter_mut().enumerate() {
                while pos < self.col_ind.len() && (self.col_ind[pos].to_index() as usize) < c {
                    pos += 1;
                }
                *slot = self.col_ptr[pos];
            }
        }

        let mut col_mask = Vec::new();
        if csc_col_ptr.is_empty()
            && ncols > 0
            && config.should_use_dcsc_bool_mask(ncols, self.col_ind.len())
        {
            col_mask = vec![false; ncols as usize];
            for col in &self.col_ind {
                col_mask[col.to_index() as usize] = true;
            }
        }

        DcscBlock {
            col_ind: self.col_ind,
            col_ptr: self.col_ptr,
            row_ind: self.row_ind,
            values: self.values,
            col_mask,
            csc_col_ptr,
        }
    }

    pub fn finish_shared(self, config: &Config) -> Arc<DcscBlock<IT, T>> {
        Arc::new(self.finish(config))
    }
}

impl<IT: LeafIndex, T: Copy> Default for DcscBuilder<IT, T> {
    fn default() -> Self {
        Self::new()
    }
}
