use std::marker::PhantomData;
use std::ops::{Add, Mul};

/// Algebra that a multiplication runs over.
///
/// `MapA`/`MapB` are the value types of the two operands and `Reduce` the
/// value type of the product. Neither identity element is required: the
/// accumulators initialize a slot with its first contribution instead of
/// folding into a zero.
pub trait Semiring {
    type MapA: Copy;
    type MapB: Copy;
    type Reduce: Copy;

    fn multiply(&self, lhs: &Self::MapA, rhs: &Self::MapB) -> Self::Reduce;

    fn add(&self, lhs: &Self::Reduce, rhs: &Self::Reduce) -> Self::Reduce;
}

/// Standard mathematical plus-times semiring.
#[derive(Debug)]
pub struct PlusTimes<T>(PhantomData<T>);

impl<T> PlusTimes<T> {
    pub fn new() -> Self {
        PlusTimes(PhantomData)
    }
}

impl<T> Default for PlusTimes<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for PlusTimes<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Copy for PlusTimes<T> {}

impl<T> Semiring for PlusTimes<T>
where
    T: Copy + Add<Output = T> + Mul<Output = T>,
{
    type MapA = T;
    type MapB = T;
    type Reduce = T;

    fn multiply(&self, lhs: &T, rhs: &T) -> T {
        *lhs * *rhs
    }

    fn add(&self, lhs: &T, rhs: &T) -> T {
        *lhs + *rhs
    }
}
