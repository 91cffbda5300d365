use crate::types::Index;

/// Tuning knobs consulted by tree construction, the DCSC builder and the
/// sparse accumulator choosers. Pass by reference; cheap to clone.
#[derive(Debug, Clone)]
pub struct Config {
    /// Leaf blocks with at least this many tuples are split during tree
    /// construction.
    pub leaf_split_threshold: usize,

    /// Maximum number of entries in a dense SpA. Larger problems use the
    /// map-based SpA.
    pub dense_spa_max_count: usize,

    /// Largest size of a dense SpA's value array in bytes. Larger problems
    /// use the map-based SpA.
    pub dense_spa_max_bytes: usize,

    /// Minimum percentage of non-empty columns for the DCSC builder to add
    /// a full CSC column pointer array. Values above 100 disable it.
    pub csc_index_min_fill_percent: usize,

    /// Largest column range for which the DCSC builder may add a column
    /// presence bitmask. Zero disables it.
    pub bool_mask_max_ncols: usize,

    /// Maximum percentage of non-empty columns for the bitmask to be worth
    /// it; denser blocks take the CSC index instead.
    pub bool_mask_max_fill_percent: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            leaf_split_threshold: 10 * 1024,
            dense_spa_max_count: 100 * 1024 * 1024,
            dense_spa_max_bytes: 10 * 1024 * 1024,
            csc_index_min_fill_percent: 50,
            bool_mask_max_ncols: 64 * 1024,
            bool_mask_max_fill_percent: 25,
        }
    }
}

impl Config {
    /// Decide whether to use a dense or a map SpA.
    ///
    /// A dense SpA is an array, so lookups are constant time, but for very
    /// tall output blocks the array itself becomes the problem.
    pub fn should_use_dense_spa<T>(&self, nrows: Index) -> bool {
        let nrows = nrows.max(0) as usize;
        nrows <= self.dense_spa_max_count
            && nrows.saturating_mul(size_of::<T>()) <= self.dense_spa_max_bytes
    }

    /// Same chooser with an estimate of the total flops the accumulator will
    /// see. The estimate is advisory and the default policy ignores it.
    pub fn should_use_dense_spa_with_flops<T>(&self, nrows: Index, _estimated_flops: f64) -> bool {
        self.should_use_dense_spa::<T>(nrows)
    }

    /// Whether the DCSC builder should add a full CSC column pointer array.
    /// Worth the `ncols + 1` ints when enough columns are non-empty.
    pub fn should_use_csc_index(&self, ncols: Index, num_nonempty_cols: usize) -> bool {
        ncols > 0
            && (num_nonempty_cols as Index) * 100 >= ncols * self.csc_index_min_fill_percent as Index
    }

    /// Whether the DCSC builder should add a column presence bitmask. Useful
    /// when lookups mostly miss and the column range is modest.
    pub fn should_use_dcsc_bool_mask(&self, ncols: Index, num_nonempty_cols: usize) -> bool {
        ncols > 0
            && ncols <= self.bool_mask_max_ncols as Index
            && (num_nonempty_cols as Index) * 100 <= ncols * self.bool_mask_max_fill_percent as Index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_spa_chooser_limits() {
        let config = Config::default();
        assert!(config.should_use_dense_spa::<f64>(1024));
        // count limit
        let tight = Config { dense_spa_max_count: 10, ..Config::default() };
        assert!(!tight.should_use_dense_spa::<f64>(11));
        assert!(tight.should_use_dense_spa::<f64>(10));
        // byte limit: 10 MiB / 8 bytes
        assert!(config.should_use_dense_spa::<f64>((10 * 1024 * 1024) / 8));
        assert!(!config.should_use_dense_spa::<f64>((10 * 1024 * 1024) / 8 + 1));
    }

    #[test]
    fn flops_estimate_is_advisory() {
        let config = Config::default();
        assert_eq!(
            config.should_use_dense_spa::<f64>(100),
            config.should_use_dense_spa_with_flops::<f64>(100, 1e12)
        );
    }

    #[test]
    fn index_choosers_split_by_density() {
        let config = Config::default();
        // mostly-full column range: CSC index, no mask
        assert!(config.should_use_csc_index(100, 80));
        assert!(!config.should_use_dcsc_bool_mask(100, 80));
        // sparse column range: mask, no CSC index
        assert!(!config.should_use_csc_index(100, 10));
        assert!(config.should_use_dcsc_bool_mask(100, 10));
    }

    #[test]
    fn index_choosers_can_be_disabled() {
        let config = Config {
            csc_index_min_fill_percent: 101,
            bool_mask_max_ncols: 0,
            ..Config::default()
        };
        assert!(!config.should_use_csc_index(100, 100));
        assert!(!config.should_use_dcsc_bool_mask(100, 1));
    }
}
