//! Sparse accumulators: scratch structures that absorb weighted column
//! contributions and emit the merged column in ascending row order.

use std::collections::BTreeMap;

use crate::config::Config;
use crate::quadtree::columns::ColumnView;
use crate::quadtree::node::LeafIndex;
use crate::semiring::Semiring;
use crate::types::Index;

/// Either SpA flavor, chosen per destination block by the configuration.
pub enum Spa<'s, S: Semiring> {
    Dense(DenseSpa<'s, S>),
    Map(MapSpa<'s, S>),
}

impl<'s, S: Semiring> Spa<'s, S> {
    /// Choose a flavor for a destination with `nrows` rows.
    pub fn choose(nrows: Index, semiring: &'s S, config: &Config) -> Self {
        if config.should_use_dense_spa::<S::Reduce>(nrows) {
            Spa::Dense(DenseSpa::new(nrows, semiring))
        } else {
            Spa::Map(MapSpa::new(semiring))
        }
    }

    /// Same, with an advisory estimate of the flops this SpA will absorb.
    pub fn choose_with_flops(
        nrows: Index,
        estimated_flops: f64,
        semiring: &'s S,
        config: &Config,
    ) -> Self {
        if config.should_use_dense_spa_with_flops::<S::Reduce>(nrows, estimated_flops) {
            Spa::Dense(DenseSpa::new(nrows, semiring))
        } else {
            Spa::Map(MapSpa::new(semiring))
        }
    }

    /// Fold a whole column in: slot `r` becomes `add(slot, v)`, first touch
    /// initializes the slot to `v`.
    pub fn scatter(&mut self, column: &ColumnView<'_, S::Reduce>) {
        match self {
            Spa::Dense(spa) => spa.scatter(column),
            Spa::Map(spa) => spa.scatter(column),
        }
    }

    /// Fold a column in with each value first multiplied by `beta` on the
    /// right.
    pub fn scatter_weighted(&mut self, column: &ColumnView<'_, S::MapA>, beta: &S::MapB) {
        match self {
            Spa::Dense(spa) => spa.scatter_weighted(column, beta),
            Spa::Map(spa) => spa.scatter_weighted(column, beta),
        }
    }

    /// Append the touched `(row, value)` pairs in ascending row order.
    pub fn gather<IT: LeafIndex>(&mut self, rows_out: &mut Vec<IT>, values_out: &mut Vec<S::Reduce>) {
        match self {
            Spa::Dense(spa) => spa.gather(rows_out, values_out),
            Spa::Map(spa) => spa.gather(rows_out, values_out),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Spa::Dense(spa) => spa.is_empty(),
            Spa::Map(spa) => spa.is_empty(),
        }
    }

    /// Reset for reuse; equivalent to a fresh instance of the same capacity.
    pub fn clear(&mut self) {
        match self {
            Spa::Dense(spa) => spa.clear(),
            Spa::Map(spa) => spa.clear(),
        }
    }
}

/// Array-backed SpA. Constant-time updates; clearing touches only the rows
/// that were set.
pub struct DenseSpa<'s, S: Semiring> {
    semiring: &'s S,

    /// Accumulated value per row; `None` marks an untouched slot.
    slots: Vec<Option<S::Reduce>>,

    /// Touched rows, unsorted until gather.
    touched: Vec<usize>,
}

impl<'s, S: Semiring> DenseSpa<'s, S> {
    pub fn new(nrows: Index, semiring: &'s S) -> Self {
        Self {
            semiring,
            slots: vec![None; nrows.max(0) as usize],
            touched: Vec::with_capacity(1024.min(nrows.max(0) as usize)),
        }
    }

    fn update(&mut self, row: Index, value: S::Reduce) {
        let slot = &mut self.slots[row as usize];
        match slot {
            Some(acc) => *acc = self.semiring.add(acc, &value),
            None => {
                *slot = Some(value);
                self.touched.push(row as usize);
            }
        }
    }

    pub fn scatter(&mut self, column: &ColumnView<'_, S::Reduce>) {
        for (row, value) in column.entries() {
            self.update(row, value);
        }
    }

    pub fn scatter_weighted(&mut self, column: &ColumnView<'_, S::MapA>, beta: &S::MapB) {
        for (row, value) in column.entries() {
            self.update(row, self.semiring.multiply(&value, beta));
        }
    }

    pub fn gather<IT: LeafIndex>(&mut self, rows_out: &mut Vec<IT>, values_out: &mut Vec<S::Reduce>) {
        self.touched.sort_unstable();
        for &row in &self.touched {
            if let Some(value) = self.slots[row] {
                rows_out.push(IT::from_index(row as Index));
                values_out.push(value);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.touched.is_empty()
    }

    pub fn clear(&mut self) {
        for &row in &self.touched {
            self.slots[row] = None;
        }
        self.touched.clear();
    }
}

/// Ordered-map SpA. O(log k) updates in the number of touched rows; the
/// right choice when the row dimension dwarfs the touched set.
pub struct MapSpa<'s, S: Semiring> {
    semiring: &'s S,
    entries: BTreeMap<Index, S::Reduce>,
}

impl<'s, S: Semiring> MapSpa<'s, S> {
    pub fn new(semiring: &'s S) -> Self {
        Self { semiring, entries: BTreeMap::new() }
    }

    fn update(&mut self, row: Index, value: S::Reduce) {
        self.entries
            .entry(row)
            .and_modify(|acc| *acc = self.semiring.add(acc, &value))
            .or_insert(value);
    }

    pub fn scatter(&mut self, column: &ColumnView<'_, S::Reduce>) {
        for (row, value) in column.entries() {
            self.update(row, value);
        }
    }

    pub fn scatter_weighted(&mut self, column: &ColumnView<'_, S::MapA>, beta: &S::MapB) {
        for (row, value) in column.entries() {
            self.update(row, self.semiring.multiply(&value, beta));
        }
    }

    pub fn gather<IT: LeafIndex>(&mut self, rows_out: &mut Vec<IT>, values_out: &mut Vec<S::Reduce>) {
        for (&row, &value) in &self.entries {
            rows_out.push(IT::from_index(row));
            values_out.push(value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadtree::columns::{RawRows, RowIndices};
    use crate::semiring::PlusTimes;
    use rstest::rstest;

    fn column<'a>(rows: &'a [i32], values: &'a [f64]) -> ColumnView<'a, f64> {
        ColumnView { col: 0, rows: RowIndices::new(RawRows::I32(rows), 0), values }
    }

    fn make_spa(dense: bool, semiring: &PlusTimes<f64>) -> Spa<'_, PlusTimes<f64>> {
        if dense {
            Spa::Dense(DenseSpa::new(16, semiring))
        } else {
            Spa::Map(MapSpa::new(semiring))
        }
    }

    #[rstest]
    #[case::dense(true)]
    #[case::map(false)]
    fn gather_is_the_sorted_fold_of_scatter(#[case] dense: bool) {
        let semiring = PlusTimes::<f64>::new();
        let mut spa = make_spa(dense, &semiring);

        spa.scatter(&column(&[5, 9], &[1.0, 2.0]));
        spa.scatter(&column(&[1, 5], &[10.0, 3.0]));
        assert!(!spa.is_empty());

        let mut rows: Vec<i32> = Vec::new();
        let mut values: Vec<f64> = Vec::new();
        spa.gather(&mut rows, &mut values);
        assert_eq!(rows, vec![1, 5, 9]);
        assert_eq!(values, vec![10.0, 4.0, 2.0]);
    }

    #[rstest]
    #[case::dense(true)]
    #[case::map(false)]
    fn weighted_scatter_multiplies_first(#[case] dense: bool) {
        let semiring = PlusTimes::<f64>::new();
        let mut spa = make_spa(dense, &semiring);

        spa.scatter_weighted(&column(&[0, 2], &[2.0, 3.0]), &10.0);
        spa.scatter_weighted(&column(&[2], &[1.0]), &5.0);

        let mut rows: Vec<i64> = Vec::new();
        let mut values: Vec<f64> = Vec::new();
        spa.gather(&mut rows, &mut values);
        assert_eq!(rows, vec![0, 2]);
        assert_eq!(values, vec![20.0, 35.0]);
    }

    #[rstest]
    #[case::dense(true)]
    #[case::map(false)]
    fn clear_makes_the_spa_fresh(#[case] dense: bool) {
        let semiring = PlusTimes::<f64>::new();
        let mut spa = make_spa(dense, &semiring);

        spa.scatter(&column(&[3], &[1.0]));
        spa.clear();
        assert!(spa.is_empty());

        spa.scatter(&column(&[7], &[2.0]));
        let mut rows: Vec<i16> = Vec::new();
        let mut values: Vec<f64> = Vec::new();
        spa.gather(&mut rows, &mut values);
        assert_eq!(rows, vec![7]);
        assert_eq!(values, vec![2.0]);
    }

    #[test]
    fn both_flavors_agree() {
        let semiring = PlusTimes::<f64>::new();
        let mut dense = Spa::Dense(DenseSpa::new(16, &semiring));
        let mut map = Spa::Map(MapSpa::new(&semiring));

        for spa in [&mut dense, &mut map] {
            spa.scatter(&column(&[0, 4, 9], &[1.0, 2.0, 3.0]));
            spa.scatter_weighted(&column(&[4, 11], &[5.0, 6.0]), &2.0);
        }

        let mut rows_d: Vec<i32> = Vec::new();
        let mut values_d: Vec<f64> = Vec::new();
        dense.gather(&mut rows_d, &mut values_d);
        let mut rows_m: Vec<i32> = Vec::new();
        let mut values_m: Vec<f64> = Vec::new();
        map.gather(&mut rows_m, &mut values_m);

        assert_eq!(rows_d, rows_m);
        assert_eq!(values_d, values_m);
    }

    #[test]
    fn chooser_respects_the_config() {
        let semiring = PlusTimes::<f64>::new();
        let config = Config::default();
        assert!(matches!(Spa::choose(100, &semiring, &config), Spa::Dense(_)));
        let tiny = Config { dense_spa_max_count: 10, ..Config::default() };
        assert!(matches!(Spa::choose(100, &semiring, &tiny), Spa::Map(_)));
    }
}
