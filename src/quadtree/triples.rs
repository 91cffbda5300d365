use crate::types::{BlockNnn, BlockSizeInfo, Index};

/// A transient bag of `(row, col, value)` triples, in arrival order.
///
/// This is the staging area for tree construction: triples arrive unsorted,
/// and the subdivider works over index permutations so the three arrays are
/// never copied or reordered.
#[derive(Debug, Clone)]
pub struct TriplesBlock<T> {
    rows: Vec<Index>,
    cols: Vec<Index>,
    values: Vec<T>,
}

impl<T: Copy> TriplesBlock<T> {
    pub fn new() -> Self {
        Self { rows: Vec::new(), cols: Vec::new(), values: Vec::new() }
    }

    pub fn with_capacity(nnn: usize) -> Self {
        Self {
            rows: Vec::with_capacity(nnn),
            cols: Vec::with_capacity(nnn),
            values: Vec::with_capacity(nnn),
        }
    }

    pub fn add(&mut self, row: Index, col: Index, value: T) {
        self.rows.push(row);
        self.cols.push(col);
        self.values.push(value);
    }

    pub fn extend(&mut self, tuples: impl IntoIterator<Item = (Index, Index, T)>) {
        for (row, col, value) in tuples {
            self.add(row, col, value);
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn nnn(&self) -> BlockNnn {
        self.values.len() as BlockNnn
    }

    pub fn size_info(&self) -> BlockSizeInfo {
        BlockSizeInfo {
            index_bytes: (self.rows.len() + self.cols.len()) * size_of::<Index>(),
            value_bytes: self.values.len() * size_of::<T>(),
            overhead_bytes: size_of::<Self>(),
            nnn: self.values.len(),
        }
    }

    pub fn row(&self, i: usize) -> Index {
        self.rows[i]
    }

    pub fn col(&self, i: usize) -> Index {
        self.cols[i]
    }

    pub fn value(&self, i: usize) -> T {
        self.values[i]
    }

    /// Tuples in arrival order.
    pub fn tuples(&self) -> impl Iterator<Item = (Index, Index, T)> + '_ {
        (0..self.len()).map(|i| (self.rows[i], self.cols[i], self.values[i]))
    }

    /// A permutation that orders the triples by `(col, row)`, ties broken by
    /// arrival position.
    pub fn sort_permutation(&self) -> Vec<usize> {
        let mut perm: Vec<usize> = (0..self.len()).collect();
        self.sort_permutation_range(&mut perm);
        perm
    }

    /// Sort an index permutation slice by `(col, row, position)` in place.
    pub fn sort_permutation_range(&self, perm: &mut [usize]) {
        perm.sort_unstable_by_key(|&i| (self.cols[i], self.rows[i], i));
    }

    /// Tuples in `(col, row)`-ascending order.
    pub fn sorted_tuples(&self) -> impl Iterator<Item = (Index, Index, T)> + '_ {
        self.permuted_tuples(self.sort_permutation())
    }

    /// Tuples in the order given by an index permutation.
    pub fn permuted_tuples<'a, I>(&'a self, perm: I) -> impl Iterator<Item = (Index, Index, T)> + 'a
    where
        I: IntoIterator<Item = usize>,
        I::IntoIter: 'a,
    {
        perm.into_iter().map(|i| (self.rows[i], self.cols[i], self.values[i]))
    }
}

impl<T: Copy> Default for TriplesBlock<T> {
    fn default() -> Self {
        Self::new()
    }
}
