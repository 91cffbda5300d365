use std::marker::PhantomData;
use std::sync::Arc;

use crate::quadtree::columns::{ColumnView, RowIndices};
use crate::quadtree::dcsc::DcscBlock;
use crate::quadtree::node::{LeafBlock, LeafIndex, LeafIndexKind, LeafNode, leaf_index_kind};
use crate::types::{BlockNnn, BlockSizeInfo, Index, Offset, Shape};

/// The owning leaf a shadow looks into. Shadows may be narrower than their
/// base (a 16-bit window over a 64-bit leaf), so the base keeps its own
/// width tag.
#[derive(Debug)]
pub enum ShadowBase<T> {
    I16(Arc<DcscBlock<i16, T>>),
    I32(Arc<DcscBlock<i32, T>>),
    I64(Arc<DcscBlock<i64, T>>),
}

impl<T> Clone for ShadowBase<T> {
    fn clone(&self) -> Self {
        match self {
            ShadowBase::I16(b) => ShadowBase::I16(Arc::clone(b)),
            ShadowBase::I32(b) => ShadowBase::I32(Arc::clone(b)),
            ShadowBase::I64(b) => ShadowBase::I64(Arc::clone(b)),
        }
    }
}

impl<T: Copy> ShadowBase<T> {
    fn num_columns(&self) -> usize {
        match self {
            ShadowBase::I16(b) => b.num_columns(),
            ShadowBase::I32(b) => b.num_columns(),
            ShadowBase::I64(b) => b.num_columns(),
        }
    }

    fn column_at(&self, pos: usize) -> ColumnView<'_, T> {
        match self {
            ShadowBase::I16(b) => b.column_at(pos),
            ShadowBase::I32(b) => b.column_at(pos),
            ShadowBase::I64(b) => b.column_at(pos),
        }
    }

    fn get_column(&self, col: Index) -> Option<ColumnView<'_, T>> {
        match self {
            ShadowBase::I16(b) => b.get_column(col),
            ShadowBase::I32(b) => b.get_column(col),
            ShadowBase::I64(b) => b.get_column(col),
        }
    }

    fn column_lower_bound(&self, col: Index) -> usize {
        match self {
            ShadowBase::I16(b) => b.column_lower_bound(col),
            ShadowBase::I32(b) => b.column_lower_bound(col),
            ShadowBase::I64(b) => b.column_lower_bound(col),
        }
    }

    fn column_upper_bound(&self, col: Index) -> usize {
        match self {
            ShadowBase::I16(b) => b.column_upper_bound(col),
            ShadowBase::I32(b) => b.column_upper_bound(col),
            ShadowBase::I64(b) => b.column_upper_bound(col),
        }
    }
}

/// A non-owning rectangular window over a DCSC leaf.
///
/// Presents `[row_begin, row_inclusive_end] x [column range]` of the base as
/// an independent leaf: emitted rows and columns have the window offsets
/// subtracted, columns whose row range misses the window are skipped, and
/// row ranges are tightened to the window on access.
#[derive(Debug)]
pub struct WindowShadowBlock<IT, T> {
    base: ShadowBase<T>,

    /// Column position range within the base's column array.
    col_begin: usize,
    col_end: usize,

    /// Subtracted from every emitted row/column; base coordinates of this
    /// window's (0, 0).
    offsets: Offset,
    shape: Shape,

    /// Row window in base coordinates, inclusive on both ends.
    row_begin: Index,
    row_inclusive_end: Index,

    _width: PhantomData<IT>,
}

impl<IT: LeafIndex, T: Copy> WindowShadowBlock<IT, T> {
    pub(crate) fn new(
        base: ShadowBase<T>,
        col_begin: usize,
        col_end: usize,
        offsets: Offset,
        shape: Shape,
    ) -> Self {
        Self {
            base,
            col_begin,
            col_end,
            offsets,
            shape,
            row_begin: offsets.row_offset,
            row_inclusive_end: offsets.row_offset + shape.nrows - 1,
            _width: PhantomData,
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Columns visible through the window, ascending, empty ones skipped.
    pub fn columns(&self) -> ShadowColumns<'_, T> {
        ShadowColumns {
            base: &self.base,
            pos: self.col_begin,
            end: self.col_end,
            offsets: self.offsets,
            row_begin: self.row_begin,
            row_inclusive_end: self.row_inclusive_end,
        }
    }

    /// Point lookup of a window-local column.
    pub fn get_column(&self, col: Index) -> Option<ColumnView<'_, T>> {
        let base_view = self.base.get_column(col + self.offsets.col_offset)?;
        clip_to_window(base_view, self.offsets, self.row_begin, self.row_inclusive_end)
    }

    /// Position of the first base column at or above the window-local `col`,
    /// clamped to the window's column position range.
    pub fn column_lower_bound(&self, col: Index) -> usize {
        self.base
            .column_lower_bound(col + self.offsets.col_offset)
            .clamp(self.col_begin, self.col_end)
    }

    pub(crate) fn column_position_range(&self) -> (usize, usize) {
        (self.col_begin, self.col_end)
    }

    /// Counting entries walks every visible column.
    pub fn nnn(&self) -> BlockNnn {
        self.columns().map(|c| c.len()).sum::<usize>() as BlockNnn
    }

    /// Shadows own no data; only the handle itself counts.
    pub fn size_info(&self) -> BlockSizeInfo {
        BlockSizeInfo { overhead_bytes: size_of::<Self>(), ..BlockSizeInfo::default() }
    }

    /// Window a sub-rectangle of this shadow. The new shadow references the
    /// owning leaf directly; offsets compose additively.
    pub fn shadow(&self, offsets: Offset, shape: Shape) -> LeafNode<T> {
        let absolute = self.offsets + offsets;
        let begin = self
            .base
            .column_lower_bound(absolute.col_offset)
            .clamp(self.col_begin, self.col_end);
        let end = self
            .base
            .column_upper_bound(absolute.col_offset + shape.ncols - 1)
            .clamp(self.col_begin, self.col_end);
        make_shadow_node(self.base.clone(), begin.min(end), end, absolute, shape)
    }

    /// `(row, col, value)` tuples visible through the window, column-major.
    pub fn tuples(&self) -> crate::quadtree::columns::Tuples<'_, T, ShadowColumns<'_, T>> {
        crate::quadtree::columns::Tuples::new(self.columns())
    }
}

/// Clip one base column to a row window and remap it to local coordinates.
/// `None` when nothing of the column is visible.
fn clip_to_window<T: Copy>(
    base_view: ColumnView<'_, T>,
    offsets: Offset,
    row_begin: Index,
    row_inclusive_end: Index,
) -> Option<ColumnView<'_, T>> {
    // fast reject on the endpoints before any search
    let first = base_view.rows.first()?;
    let last = base_view.rows.last()?;
    if first > row_inclusive_end || last < row_begin {
        return None;
    }

    let (lo, hi) = base_view.rows.raw().tighten(row_begin, row_inclusive_end);
    if lo >= hi {
        return None;
    }

    Some(ColumnView {
        col: base_view.col - offsets.col_offset,
        rows: RowIndices::new(base_view.rows.raw().slice(lo, hi), offsets.row_offset),
        values: &base_view.values[lo..hi],
    })
}

/// Column iterator over a shadow window. Skips base columns with no rows in
/// the window.
#[derive(Debug, Clone)]
pub struct ShadowColumns<'a, T> {
    base: &'a ShadowBase<T>,
    pos: usize,
    end: usize,
    offsets: Offset,
    row_begin: Index,
    row_inclusive_end: Index,
}

impl<'a, T: Copy> Iterator for ShadowColumns<'a, T> {
    type Item = ColumnView<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.end {
            let view = self.base.column_at(self.pos);
            self.pos += 1;
            if let Some(clipped) =
                clip_to_window(view, self.offsets, self.row_begin, self.row_inclusive_end)
            {
                return Some(clipped);
            }
        }
        None
    }
}

/// Wrap a window of a base leaf in a shadow leaf node, choosing the shadow's
/// index width from the window shape.
pub(crate) fn make_shadow_node<T: Copy>(
    base: ShadowBase<T>,
    col_begin: usize,
    col_end: usize,
    offsets: Offset,
    shape: Shape,
) -> LeafNode<T> {
    debug_assert!(col_begin <= col_end && col_end <= base.num_columns());
    match leaf_index_kind(&shape) {
        LeafIndexKind::I16 => LeafNode::I16(LeafBlock::Shadow(Arc::new(
            WindowShadowBlock::<i16, T>::new(base, col_begin, col_end, offsets, shape),
        ))),
        LeafIndexKind::I32 => LeafNode::I32(LeafBlock::Shadow(Arc::new(
            WindowShadowBlock::<i32, T>::new(base, col_begin, col_end, offsets, shape),
        ))),
        LeafIndexKind::I64 => LeafNode::I64(LeafBlock::Shadow(Arc::new(
            WindowShadowBlock::<i64, T>::new(base, col_begin, col_end, offsets, shape),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::quadtree::dcsc::DcscBuilder;

    // 4x4 block:
    //   [ 1 . 5 . ]
    //   [ . 3 . 7 ]
    //   [ 2 . 6 . ]
    //   [ . 4 . 8 ]
    fn base() -> Arc<DcscBlock<i16, f64>> {
        let mut b = DcscBuilder::new();
        b.push(0, 0, 1.0);
        b.push(2, 0, 2.0);
        b.push(1, 1, 3.0);
        b.push(3, 1, 4.0);
        b.push(0, 2, 5.0);
        b.push(2, 2, 6.0);
        b.push(1, 3, 7.0);
        b.push(3, 3, 8.0);
        b.finish_shared(&Config::default())
    }

    fn tuples_of<T: Copy>(leaf: &LeafNode<T>) -> Vec<(Index, Index, T)> {
        leaf.tuples().collect()
    }

    #[test]
    fn whole_leaf_shadow_is_identity() {
        let base = base();
        let shadow = DcscBlock::shadow(
            &base,
            Offset::default(),
            Shape { nrows: 4, ncols: 4 },
        );
        assert_eq!(tuples_of(&shadow), base.tuples().collect::<Vec<_>>());
        assert_eq!(shadow.nnn(), 8);
    }

    #[test]
    fn quadrant_windows_remap_coordinates() {
        let base = base();
        // SE quadrant: rows 2..4, cols 2..4
        let se = DcscBlock::shadow(
            &base,
            Offset { row_offset: 2, col_offset: 2 },
            Shape { nrows: 2, ncols: 2 },
        );
        assert_eq!(tuples_of(&se), vec![(0, 0, 6.0), (1, 1, 8.0)]);
        assert_eq!(se.nnn(), 2);

        // NE quadrant: rows 0..2, cols 2..4
        let ne = DcscBlock::shadow(
            &base,
            Offset { row_offset: 0, col_offset: 2 },
            Shape { nrows: 2, ncols: 2 },
        );
        assert_eq!(tuples_of(&ne), vec![(0, 0, 5.0), (1, 1, 7.0)]);
    }

    #[test]
    fn emitted_coordinates_stay_inside_the_window_shape() {
        let base = base();
        let shadow = DcscBlock::shadow(
            &base,
            Offset { row_offset: 1, col_offset: 1 },
            Shape { nrows: 2, ncols: 2 },
        );
        for (row, col, _) in tuples_of(&shadow) {
            assert!((0..2).contains(&row));
            assert!((0..2).contains(&col));
        }
        // rows 1..3 x cols 1..3 holds (1,1)=3 and (2,2)=6
        assert_eq!(tuples_of(&shadow), vec![(0, 0, 3.0), (1, 1, 6.0)]);
    }

    #[test]
    fn point_lookup_clips_and_remaps() {
        let base = base();
        let shadow = DcscBlock::shadow(
            &base,
            Offset { row_offset: 2, col_offset: 0 },
            Shape { nrows: 2, ncols: 4 },
        );
        let c0 = shadow.get_column(0).unwrap();
        assert_eq!(c0.entries().collect::<Vec<_>>(), vec![(0, 2.0)]);
        // column 1 of the base has rows 1 and 3; only row 3 is visible
        let c1 = shadow.get_column(1).unwrap();
        assert_eq!(c1.entries().collect::<Vec<_>>(), vec![(1, 4.0)]);
    }

    #[test]
    fn nested_shadow_references_the_owning_leaf() {
        let base = base();
        // south half, then its east half
        let south = DcscBlock::shadow(
            &base,
            Offset { row_offset: 2, col_offset: 0 },
            Shape { nrows: 2, ncols: 4 },
        );
        let LeafNode::I16(LeafBlock::Shadow(south_block)) = &south else {
            panic!("expected a 16-bit shadow");
        };
        let se = south_block.shadow(
            Offset { row_offset: 0, col_offset: 2 },
            Shape { nrows: 2, ncols: 2 },
        );
        assert_eq!(tuples_of(&se), vec![(0, 0, 6.0), (1, 1, 8.0)]);
        // the nested shadow holds the original base, not the middle shadow
        let LeafNode::I16(LeafBlock::Shadow(se_block)) = &se else {
            panic!("expected a 16-bit shadow");
        };
        match &se_block.base {
            ShadowBase::I16(owned) => assert!(Arc::ptr_eq(owned, &base)),
            other => panic!("unexpected base width: {other:?}"),
        }
    }

    #[test]
    fn shadow_width_follows_the_window_shape() {
        let mut b = DcscBuilder::<i32, f64>::new();
        b.push(0, 0, 1.0);
        b.push(40_000, 1, 2.0);
        let base = b.finish_shared(&Config::default());
        // a small window over a wide base narrows to 16-bit indices
        let shadow =
            DcscBlock::shadow(&base, Offset::default(), Shape { nrows: 4, ncols: 2 });
        assert!(matches!(shadow, LeafNode::I16(_)));
        assert_eq!(shadow.tuples().collect::<Vec<_>>(), vec![(0, 0, 1.0)]);
    }

    #[test]
    fn empty_window_has_no_columns() {
        let base = base();
        // base column 1 has rows {1, 3}; a row window of {0} sees nothing
        let shadow = DcscBlock::shadow(
            &base,
            Offset { row_offset: 0, col_offset: 1 },
            Shape { nrows: 1, ncols: 1 },
        );
        assert_eq!(shadow.nnn(), 0);
        assert_eq!(tuples_of(&shadow).len(), 0);
        assert!(shadow.get_column(0).is_none());
    }
}
