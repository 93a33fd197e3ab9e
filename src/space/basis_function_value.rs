use super::MAX_DIMENSION;
use crate::misc::FloatingPoint;

/// A basis function not vanishing at an evaluation point.
///
/// Holds the linear control point index the function belongs to, its value
/// and its first and second parametric derivatives (unused directions are zero).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BasisFunctionValue<T> {
    index: usize,
    value: T,
    derivatives: [T; MAX_DIMENSION],
    second_derivatives: [[T; MAX_DIMENSION]; MAX_DIMENSION],
}

impl<T: FloatingPoint> BasisFunctionValue<T> {
    pub fn new(index: usize, value: T) -> Self {
        Self {
            index,
            value,
            derivatives: [T::zero(); MAX_DIMENSION],
            second_derivatives: [[T::zero(); MAX_DIMENSION]; MAX_DIMENSION],
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn value(&self) -> T {
        self.value
    }

    pub fn derivative(&self, direction: usize) -> T {
        self.derivatives[direction]
    }

    pub fn second_derivative(&self, i: usize, j: usize) -> T {
        self.second_derivatives[i][j]
    }

    pub(crate) fn set_derivative(&mut self, direction: usize, value: T) {
        self.derivatives[direction] = value;
    }

    pub(crate) fn set_second_derivative(&mut self, i: usize, j: usize, value: T) {
        self.second_derivatives[i][j] = value;
        self.second_derivatives[j][i] = value;
    }
}
