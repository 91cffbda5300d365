//! The leaf-pair multiply kernel.

use std::sync::Arc;

use crate::algorithms::spa::Spa;
use crate::config::Config;
use crate::quadtree::dcsc::{DcscBlock, DcscBuilder};
use crate::quadtree::node::{LeafIndex, LeafNode};
use crate::semiring::Semiring;
use crate::types::Shape;

/// Multiply two aligned leaves into a fresh DCSC block of the result width.
///
/// Scans `b` column by column; for each entry `(i, b_ij)` the matching
/// column `i` of `a` is point-looked-up and scattered into the SpA with
/// weight `b_ij`. Each finished column is drained into the builder, so the
/// result columns appear in ascending order.
pub fn multiply_leaf_pair<RetIT, S>(
    a: &LeafNode<S::MapA>,
    b: &LeafNode<S::MapB>,
    result_shape: &Shape,
    semiring: &S,
    config: &Config,
) -> Arc<DcscBlock<RetIT, S::Reduce>>
where
    RetIT: LeafIndex,
    S: Semiring,
{
    let mut builder = DcscBuilder::new();
    let mut spa = Spa::choose(result_shape.nrows, semiring, config);

    for b_column in b.columns() {
        for (i, b_value) in b_column.entries() {
            if let Some(a_column) = a.get_column(i) {
                spa.scatter_weighted(&a_column, &b_value);
            }
        }
        builder.add_column_from_spa(RetIT::from_index(b_column.col), &mut spa);
        spa.clear();
    }

    Arc::new(builder.finish(config))
}
