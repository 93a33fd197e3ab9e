use nalgebra::DMatrix;

use crate::error::{GeometryError, GeometryResult};
use crate::knot::KnotVector;
use crate::misc::{Binomial, FloatingPoint};
use crate::patch::{PatchAccess, PatchPtr};

use super::propagation::{refine_with_propagation, DirectionRequest};

/// Degree increment along one direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub(crate) struct DegreeRequest(pub usize);

impl<T: FloatingPoint> DirectionRequest<T> for DegreeRequest {
    fn none() -> Self {
        Self(0)
    }

    fn is_none(&self) -> bool {
        self.0 == 0
    }

    fn absorb(&mut self, incoming: &Self) -> Option<Self> {
        if incoming.0 > self.0 {
            self.0 = incoming.0;
            Some(*incoming)
        } else {
            None
        }
    }

    fn mapped(&self, _domain: (T, T), _reversed: bool) -> Self {
        *self
    }

    fn refine(
        &self,
        _direction: usize,
        degree: usize,
        knots: &KnotVector<T>,
    ) -> GeometryResult<(usize, KnotVector<T>, DMatrix<T>)> {
        let (elevated, matrix) = elevation_matrix(knots, degree, self.0)?;
        Ok((degree + self.0, elevated, matrix))
    }
}

/// Raise the degree of a B-spline basis by `increment`.
///
/// Returns the knot vector of the elevated basis, whose ends and interior knots are repeated
/// `increment` more times, and the matrix mapping the old coefficients to the new ones.
/// The curve is split into Bezier segments, every segment is elevated with binomial blending,
/// and the segments are merged back by solving for the coefficients of the elevated basis.
///
/// # Example
/// ```
/// use isopatch::prelude::*;
/// let knots = KnotVector::new(vec![0., 0., 0.5, 1., 1.]);
/// let (elevated, m) = elevation_matrix(&knots, 1, 1).unwrap();
/// assert_eq!(elevated.to_vec(), vec![0., 0., 0., 0.5, 0.5, 1., 1., 1.]);
/// assert_eq!(m.shape(), (5, 3));
/// ```
pub fn elevation_matrix<T: FloatingPoint>(
    knots: &KnotVector<T>,
    degree: usize,
    increment: usize,
) -> GeometryResult<(KnotVector<T>, DMatrix<T>)> {
    let n = knots.number_of_basis(degree);
    if increment == 0 {
        return Ok((knots.clone(), DMatrix::identity(n, n)));
    }

    let interior = knots.interior_multiplicity();
    let segments = interior.len() + 1;
    let elevated = degree + increment;

    // split into Bezier segments
    let to_bezier: Vec<T> = interior
        .iter()
        .flat_map(|m| std::iter::repeat(m.knot()).take(degree - m.multiplicity()))
        .collect();
    let (_, split) = knots.refinement_matrix(degree, &to_bezier);

    // elevate each segment, sharing the end points of adjacent segments
    let mut binomial = Binomial::<T>::new();
    let block = binomial.bezier_elevation(degree, increment);
    let mut raise = DMatrix::zeros(segments * elevated + 1, segments * degree + 1);
    for s in 0..segments {
        raise
            .view_mut((s * elevated, s * degree), (elevated + 1, degree + 1))
            .copy_from(&block);
    }

    let (a, b) = knots.domain(degree);
    let mut target = vec![a; elevated + 1];
    for m in interior.iter() {
        target.extend(std::iter::repeat(m.knot()).take(m.multiplicity() + increment));
    }
    target.extend(std::iter::repeat(b).take(elevated + 1));
    let target = KnotVector::new(target);

    let (_, merge) = target.refinement_matrix(elevated, &to_bezier);

    // merge is the Bezier extraction of the target basis, which has full column rank
    let rhs = raise * split;
    let qr = merge.qr();
    let solution = qr
        .r()
        .solve_upper_triangular(&(qr.q().transpose() * rhs))
        .ok_or_else(|| {
            GeometryError::DegenerateGeometry(
                "degree elevation could not merge the Bezier segments".to_string(),
            )
        })?;

    Ok((target, solution))
}

/// Elevate the degree of a patch, one increment per parametric direction, keeping its shape.
///
/// Increments are carried across every interface running along the elevated direction
/// so matched sides keep equal degrees and knots. A patch reached along several paths
/// is elevated once by the largest increment it received. Nothing is modified on failure.
/// Returns the number of elevated patches.
///
/// # Example
/// ```
/// use isopatch::prelude::*;
///
/// let patch = Patch::try_new(
///     1,
///     FunctionSpace::rectangular(1, 1),
///     ControlGrid::rectangular(0., 0., 2, 2, 1., 1.),
/// ).unwrap().into_ptr();
/// degree_elevate(&patch, &[1, 0]).unwrap();
/// assert_eq!(patch.patch().degree(0), 2);
/// assert!(degree_elevate(&patch, &[1]).is_err());
/// ```
pub fn degree_elevate<T: FloatingPoint>(
    patch: &PatchPtr<T>,
    increments: &[usize],
) -> GeometryResult<usize> {
    let dimension = patch.patch().dimension();
    if increments.len() != dimension {
        return Err(GeometryError::InvalidDegreeIncrement(format!(
            "{} increments given for a {}-dimensional patch",
            increments.len(),
            dimension
        )));
    }
    let requests = increments.iter().map(|t| DegreeRequest(*t)).collect();
    refine_with_propagation(patch, requests)
}
