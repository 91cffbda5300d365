use crate::quadtree::node::TreeNode;
use crate::types::{Index, Shape, discriminating_bit};

/// Holder for the root of a quadtree.
///
/// The root behaves like the NW slot of a nominal inner block whose
/// discriminating bit lies one power of two beyond the largest dimension;
/// that makes the root uniform with every other destination slot, which is
/// what lets the multiply planner decide "this result should not subdivide".
#[derive(Debug, Clone)]
pub struct SingleBlockContainer<T> {
    shape: Shape,
    node: TreeNode<T>,
}

impl<T> SingleBlockContainer<T> {
    pub fn new(shape: Shape) -> Self {
        Self { shape, node: TreeNode::Empty }
    }

    pub fn with_node(shape: Shape, node: TreeNode<T>) -> Self {
        Self { shape, node }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn node(&self) -> &TreeNode<T> {
        &self.node
    }

    pub fn set_node(&mut self, node: TreeNode<T>) {
        self.node = node;
    }

    pub fn into_node(self) -> TreeNode<T> {
        self.node
    }

    pub fn discriminating_bit(&self) -> Index {
        Self::discriminating_bit_for(&self.shape)
    }

    pub fn discriminating_bit_for(shape: &Shape) -> Index {
        if shape.nrows.max(shape.ncols) < 2 {
            return 1;
        }
        discriminating_bit(shape) << 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_bit_sits_beyond_the_shape() {
        let bit = |nrows, ncols| {
            SingleBlockContainer::<f64>::discriminating_bit_for(&Shape { nrows, ncols })
        };
        assert_eq!(bit(1, 1), 1);
        assert_eq!(bit(0, 0), 1);
        assert_eq!(bit(2, 2), 2);
        assert_eq!(bit(7, 7), 8);
        assert_eq!(bit(8, 8), 8);
        assert_eq!(bit(9, 9), 16);
        // no tuple of a 7x7 matrix has bit 8 or above set
        assert!(bit(7, 7) > 6);
    }
}
