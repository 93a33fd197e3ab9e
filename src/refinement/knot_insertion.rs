use nalgebra::DMatrix;

use crate::error::{GeometryError, GeometryResult};
use crate::knot::KnotVector;
use crate::misc::{knot_tolerance, FloatingPoint};
use crate::patch::PatchPtr;

use super::propagation::{refine_with_propagation, DirectionRequest};

/// Knots to insert along one direction, repeated values inserted as many times as listed.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct KnotRequest<T> {
    knots: Vec<T>,
}

impl<T: FloatingPoint> KnotRequest<T> {
    pub fn new(knots: Vec<T>) -> Self {
        Self { knots }
    }
}

impl<T: FloatingPoint> DirectionRequest<T> for KnotRequest<T> {
    fn none() -> Self {
        Self { knots: vec![] }
    }

    fn is_none(&self) -> bool {
        self.knots.is_empty()
    }

    /// Multiset difference within the knot tolerance
    fn absorb(&mut self, incoming: &Self) -> Option<Self> {
        let tol = knot_tolerance::<T>();
        let mut pool = self.knots.clone();
        let mut fresh = vec![];
        for knot in incoming.knots.iter() {
            match pool.iter().position(|k| (*k - *knot).abs() <= tol) {
                Some(i) => {
                    pool.swap_remove(i);
                }
                None => fresh.push(*knot),
            }
        }
        if fresh.is_empty() {
            return None;
        }
        self.knots.extend(fresh.iter().copied());
        Some(Self::new(fresh))
    }

    fn mapped(&self, (a, b): (T, T), reversed: bool) -> Self {
        if reversed {
            Self::new(self.knots.iter().map(|k| a + b - *k).collect())
        } else {
            self.clone()
        }
    }

    fn refine(
        &self,
        direction: usize,
        degree: usize,
        knots: &KnotVector<T>,
    ) -> GeometryResult<(usize, KnotVector<T>, DMatrix<T>)> {
        let tol = knot_tolerance::<T>();
        let (a, b) = knots.domain(degree);
        for knot in self.knots.iter() {
            let invalid = |reason: String| GeometryError::InvalidKnotValue {
                direction,
                knot: knot.to_f64().unwrap_or(f64::NAN),
                reason,
            };
            if !(*knot > a + tol && *knot < b - tol) {
                return Err(invalid(format!(
                    "outside the open domain ({}, {})",
                    a.to_f64().unwrap_or(f64::NAN),
                    b.to_f64().unwrap_or(f64::NAN)
                )));
            }
            let requested = self
                .knots
                .iter()
                .filter(|k| (**k - *knot).abs() <= tol)
                .count();
            let existing = knots.multiplicity_of(*knot);
            if existing + requested > degree {
                return Err(invalid(format!(
                    "multiplicity {} would exceed degree {}",
                    existing + requested,
                    degree
                )));
            }
        }

        let (refined, matrix) = knots.refinement_matrix(degree, &self.knots);
        Ok((degree, refined, matrix))
    }
}

/// Insert knots into a patch, one list per parametric direction, keeping its shape.
///
/// The knots are carried through every interface running along the refined direction,
/// so neighbors (and their neighbors) are refined as well and matched sides stay conforming.
/// A knot must lie strictly inside the domain and its multiplicity must stay within the degree.
/// Nothing is modified when any affected patch rejects the refinement.
/// Returns the number of refined patches.
///
/// # Example
/// ```
/// use isopatch::prelude::*;
///
/// let patch = Patch::try_new(
///     1,
///     FunctionSpace::rectangular(2, 1),
///     ControlGrid::rectangular(0., 0., 3, 2, 1., 1.),
/// ).unwrap().into_ptr();
/// insert_knots(&patch, &[vec![0.5], vec![]]).unwrap();
/// assert_eq!(patch.patch().function_space().number(0), 4);
/// assert!(insert_knots(&patch, &[vec![1.0], vec![]]).is_err());
/// ```
pub fn insert_knots<T: FloatingPoint>(
    patch: &PatchPtr<T>,
    knots: &[Vec<T>],
) -> GeometryResult<usize> {
    let requests = knots.iter().map(|k| KnotRequest::new(k.clone())).collect();
    refine_with_propagation(patch, requests)
}
