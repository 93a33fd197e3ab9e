use argmin::core::{CostFunction, Gradient, Hessian};
use nalgebra::{DMatrix, DVector, Point3};

use crate::misc::{scalar, FloatingPoint};
use crate::patch::Patch;

/// Cost, gradient & Hessian provider for finding the closest parameter on a patch to a given point.
///
/// The cost is half the squared distance `|S(xi) - p|^2 / 2`.
pub struct PatchClosestParameterProblem<'a, T: FloatingPoint> {
    /// The point to find the closest parameter to.
    point: &'a Point3<T>,
    /// The patch to find the closest parameter on.
    patch: &'a Patch<T>,
}

impl<'a, T: FloatingPoint> PatchClosestParameterProblem<'a, T> {
    pub fn new(point: &'a Point3<T>, patch: &'a Patch<T>) -> Self {
        PatchClosestParameterProblem { point, patch }
    }
}

impl<T: FloatingPoint> CostFunction for PatchClosestParameterProblem<'_, T> {
    type Param = DVector<T>;
    type Output = T;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, anyhow::Error> {
        let p = self.patch.point_at(param.as_slice())?;
        let d = p - self.point;
        Ok(d.norm_squared() * scalar::<T>(0.5))
    }
}

impl<T: FloatingPoint> Gradient for PatchClosestParameterProblem<'_, T> {
    type Param = DVector<T>;
    type Gradient = DVector<T>;

    /// S_i(xi) * ( S(xi) - p )
    fn gradient(&self, param: &Self::Param) -> Result<Self::Gradient, anyhow::Error> {
        let e = self.patch.evaluate(param.as_slice())?;
        let d = e.point - self.point;
        Ok(DVector::from_iterator(
            e.first.len(),
            e.first.iter().map(|s| s.dot(&d)),
        ))
    }
}

impl<T: FloatingPoint> Hessian for PatchClosestParameterProblem<'_, T> {
    type Param = DVector<T>;
    type Hessian = DMatrix<T>;

    /// S_i(xi) * S_j(xi) + S_ij(xi) * ( S(xi) - p )
    fn hessian(&self, param: &Self::Param) -> Result<Self::Hessian, anyhow::Error> {
        let e = self.patch.evaluate(param.as_slice())?;
        let d = e.point - self.point;
        let n = e.first.len();
        Ok(DMatrix::from_fn(n, n, |i, j| {
            e.first[i].dot(&e.first[j]) + e.second[i][j].dot(&d)
        }))
    }
}
