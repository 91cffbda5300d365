//! Optional parallel teardown of a quadtree.
//!
//! Dropping a large tree is a sequential pointer chase. When a matrix is
//! known to be unused, the tree can be peeled into subtree roots and dropped
//! on a worker pool instead. Must only be called when no other reference to
//! any part of the tree exists; shared subtrees are dropped on the calling
//! thread.

use std::collections::VecDeque;

use rayon::prelude::*;

use crate::matrix::Matrix;
use crate::quadtree::node::TreeNode;

/// Consume `matrix` and release its storage using up to `parallelism`
/// worker threads.
pub fn destroy_parallel<T>(matrix: Matrix<T>, parallelism: usize)
where
    T: Copy + Send + Sync,
{
    let parallelism = parallelism.max(1);

    let mut roots: VecDeque<TreeNode<T>> = VecDeque::new();
    roots.push_back(matrix.into_root_node());

    // peel inner blocks until there are enough independent subtrees
    while roots.len() < parallelism {
        let Some(node) = roots.pop_front() else { break };
        let TreeNode::Inner(inner) = node else { continue };
        match std::sync::Arc::try_unwrap(inner) {
            Ok(owned) => roots.extend(owned.into_children()),
            // someone else still holds this subtree; just release our handle
            Err(shared) => drop(shared),
        }
    }

    if roots.is_empty() {
        return;
    }

    let roots: Vec<TreeNode<T>> = roots.into();
    match rayon::ThreadPoolBuilder::new().num_threads(parallelism).build() {
        Ok(pool) => pool.install(|| roots.into_par_iter().for_each(drop)),
        Err(_) => drop(roots),
    }
}
