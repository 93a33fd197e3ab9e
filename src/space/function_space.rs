use std::fmt;

use itertools::Itertools;
use simba::scalar::SupersetOf;

use crate::error::{GeometryError, GeometryResult};
use crate::knot::KnotVector;
use crate::misc::{knot_tolerance, FloatingPoint, Reversible};

use super::{BasisFunctionValue, BoundarySide};

/// Largest number of parametric directions of a function space
pub const MAX_DIMENSION: usize = 3;

/// Tensor-product B-spline function space.
/// One open knot vector and one polynomial degree per parametric direction.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionSpace<T> {
    degrees: Vec<usize>,
    knots: Vec<KnotVector<T>>,
}

impl<T: FloatingPoint> FunctionSpace<T> {
    /// Create a function space from degrees and knot vectors, checking every direction.
    /// # Example
    /// ```
    /// use isopatch::prelude::*;
    /// let space = FunctionSpace::try_new(
    ///     vec![1],
    ///     vec![KnotVector::new(vec![0., 0., 0.5, 1., 1.])],
    /// ).unwrap();
    /// assert_eq!(space.number(0), 3);
    ///
    /// let malformed =
    ///     FunctionSpace::try_new(vec![2], vec![KnotVector::new(vec![0., 0., 1., 1.])]);
    /// assert!(malformed.is_err());
    /// ```
    pub fn try_new(degrees: Vec<usize>, knots: Vec<KnotVector<T>>) -> GeometryResult<Self> {
        if degrees.len() != knots.len() {
            return Err(GeometryError::InvalidTopology(format!(
                "{} degrees given for {} knot vectors",
                degrees.len(),
                knots.len()
            )));
        }
        if degrees.is_empty() || degrees.len() > MAX_DIMENSION {
            return Err(GeometryError::InvalidTopology(format!(
                "a function space has 1 to {} directions, got {}",
                MAX_DIMENSION,
                degrees.len()
            )));
        }
        for (degree, knots) in degrees.iter().zip(knots.iter()) {
            knots.validate(*degree)?;
        }
        Ok(Self { degrees, knots })
    }

    /// Minimal open B-spline basis of `degree` on [0, 1], i.e. the Bernstein basis.
    /// # Example
    /// ```
    /// use isopatch::prelude::*;
    /// let space = FunctionSpace::<f64>::primitive(2);
    /// assert_eq!(space.knots(0).to_vec(), vec![0., 0., 0., 1., 1., 1.]);
    /// assert_eq!(space.number(0), 3);
    /// ```
    pub fn primitive(degree: usize) -> Self {
        Self {
            degrees: vec![degree],
            knots: vec![KnotVector::open_uniform(degree + 1, degree)],
        }
    }

    /// Open uniform space of `n` basis functions of `degree` on [0, 1].
    pub fn try_uniform(n: usize, degree: usize) -> GeometryResult<Self> {
        if n < degree + 1 {
            return Err(GeometryError::InvalidTopology(format!(
                "{} control points cannot carry degree {} (at least {} needed)",
                n,
                degree,
                degree + 1
            )));
        }
        Ok(Self {
            degrees: vec![degree],
            knots: vec![KnotVector::open_uniform(n, degree)],
        })
    }

    /// Tensor product of the given spaces, their directions concatenated in order.
    pub fn try_tensor(spaces: &[FunctionSpace<T>]) -> GeometryResult<Self> {
        let degrees = spaces.iter().flat_map(|s| s.degrees.clone()).collect();
        let knots = spaces.iter().flat_map(|s| s.knots.clone()).collect();
        Self::try_new(degrees, knots)
    }

    /// Bivariate Bernstein space of the given degrees on [0, 1]^2.
    pub fn rectangular(degree_u: usize, degree_v: usize) -> Self {
        let u = Self::primitive(degree_u);
        let v = Self::primitive(degree_v);
        Self {
            degrees: vec![degree_u, degree_v],
            knots: vec![u.knots[0].clone(), v.knots[0].clone()],
        }
    }

    /// Trivariate Bernstein space of the given degrees on [0, 1]^3.
    pub fn cuboid(degree_u: usize, degree_v: usize, degree_w: usize) -> Self {
        let degrees = vec![degree_u, degree_v, degree_w];
        let knots = degrees
            .iter()
            .map(|p| KnotVector::open_uniform(p + 1, *p))
            .collect();
        Self { degrees, knots }
    }

    pub fn dimension(&self) -> usize {
        self.degrees.len()
    }

    pub fn degree(&self, direction: usize) -> usize {
        self.degrees[direction]
    }

    pub fn degrees(&self) -> &[usize] {
        &self.degrees
    }

    pub fn knots(&self, direction: usize) -> &KnotVector<T> {
        &self.knots[direction]
    }

    pub fn knot_vectors(&self) -> &[KnotVector<T>] {
        &self.knots
    }

    /// Number of control points (basis functions) in `direction`
    pub fn number(&self, direction: usize) -> usize {
        self.knots[direction].number_of_basis(self.degrees[direction])
    }

    /// Number of control points per direction
    pub fn numbers(&self) -> Vec<usize> {
        (0..self.dimension()).map(|d| self.number(d)).collect()
    }

    pub fn total_number(&self) -> usize {
        self.numbers().iter().product()
    }

    pub fn domain(&self, direction: usize) -> (T, T) {
        self.knots[direction].domain(self.degrees[direction])
    }

    /// Check if a parametric point lies in the domain (within the knot tolerance)
    pub fn is_inside(&self, xi: &[T]) -> bool {
        let tol = knot_tolerance::<T>();
        xi.len() == self.dimension()
            && xi.iter().enumerate().all(|(d, x)| {
                let (a, b) = self.domain(d);
                *x >= a - tol && *x <= b + tol
            })
    }

    /// Linear index of a structured index, the first direction running fastest
    pub fn linear_index(&self, index: &[usize]) -> usize {
        let mut stride = 1;
        let mut linear = 0;
        for (d, i) in index.iter().enumerate() {
            linear += i * stride;
            stride *= self.number(d);
        }
        linear
    }

    /// Structured index of a linear index
    pub fn structured_index(&self, mut linear: usize) -> Vec<usize> {
        (0..self.dimension())
            .map(|d| {
                let n = self.number(d);
                let i = linear % n;
                linear /= n;
                i
            })
            .collect()
    }

    /// Evaluate all basis functions not vanishing at `xi`, with their first and second derivatives.
    /// Parameters outside the domain are clamped onto it.
    ///
    /// # Example
    /// ```
    /// use isopatch::prelude::*;
    /// let space = FunctionSpace::<f64>::rectangular(2, 1);
    /// let basis = space.evaluate_basis(&[0.5, 0.25]).unwrap();
    /// assert_eq!(basis.len(), 6);
    /// let sum: f64 = basis.iter().map(|b| b.value()).sum();
    /// assert!((sum - 1.0).abs() < 1e-12);
    /// ```
    pub fn evaluate_basis(&self, xi: &[T]) -> GeometryResult<Vec<BasisFunctionValue<T>>> {
        if xi.len() != self.dimension() {
            return Err(GeometryError::InvalidTopology(format!(
                "expected {} parametric coordinates, got {}",
                self.dimension(),
                xi.len()
            )));
        }

        let per_direction = (0..self.dimension())
            .map(|d| {
                let degree = self.degrees[d];
                let knots = &self.knots[d];
                let u = knots.clamp(degree, xi[d]);
                let span = knots.find_knot_span_index(self.number(d) - 1, degree, u);
                let ders = knots.derivative_basis_functions(span, u, degree, 2);
                (span - degree, ders)
            })
            .collect_vec();

        let basis = per_direction
            .iter()
            .map(|(_, ders)| 0..ders[0].len())
            .multi_cartesian_product()
            .map(|local| {
                let index = local
                    .iter()
                    .enumerate()
                    .map(|(d, l)| per_direction[d].0 + l)
                    .collect_vec();
                let product = |orders: &dyn Fn(usize) -> usize| {
                    local.iter().enumerate().fold(T::one(), |acc, (d, l)| {
                        acc * per_direction[d].1[orders(d)][*l]
                    })
                };

                let mut value = BasisFunctionValue::new(self.linear_index(&index), product(&|_| 0));
                for i in 0..self.dimension() {
                    value.set_derivative(i, product(&|d| usize::from(d == i)));
                    for j in i..self.dimension() {
                        let second = product(&|d| usize::from(d == i) + usize::from(d == j));
                        value.set_second_derivative(i, j, second);
                    }
                }
                value
            })
            .collect();

        Ok(basis)
    }

    /// Function space of a boundary side, made of the directions running along it.
    pub fn boundary_space(&self, side: BoundarySide) -> GeometryResult<Self> {
        if self.dimension() < 2 || !side.is_valid_for(self.dimension()) {
            return Err(GeometryError::InvalidTopology(format!(
                "a {}-dimensional space has no boundary space on {}",
                self.dimension(),
                side
            )));
        }
        let directions = side.tangential_directions(self.dimension());
        Ok(Self {
            degrees: directions.iter().map(|d| self.degrees[*d]).collect(),
            knots: directions.iter().map(|d| self.knots[*d].clone()).collect(),
        })
    }

    /// Linear indices of the control points lying on a boundary side.
    /// The indices follow the side's own ordering: its first tangential direction runs fastest.
    /// # Example
    /// ```
    /// use isopatch::prelude::*;
    /// let space = FunctionSpace::<f64>::rectangular(1, 2);
    /// assert_eq!(space.boundary_indices(BoundarySide::U1), vec![1, 3, 5]);
    /// assert_eq!(space.boundary_indices(BoundarySide::V0), vec![0, 1]);
    /// ```
    pub fn boundary_indices(&self, side: BoundarySide) -> Vec<usize> {
        let dimension = self.dimension();
        if !side.is_valid_for(dimension) {
            return vec![];
        }
        let fixed = if side.is_max() {
            self.number(side.direction()) - 1
        } else {
            0
        };
        let tangential = side.tangential_directions(dimension);
        let total: usize = tangential.iter().map(|d| self.number(*d)).product();

        (0..total)
            .map(|mut local| {
                let mut index = vec![0; dimension];
                index[side.direction()] = fixed;
                for d in tangential.iter() {
                    let n = self.number(*d);
                    index[*d] = local % n;
                    local /= n;
                }
                self.linear_index(&index)
            })
            .collect()
    }

    /// Replace the knot vector and degree of one direction.
    pub(crate) fn with_direction(
        &self,
        direction: usize,
        degree: usize,
        knots: KnotVector<T>,
    ) -> Self {
        let mut space = self.clone();
        space.degrees[direction] = degree;
        space.knots[direction] = knots;
        space
    }

    /// Append a direction to the space, as used when lofting sections.
    pub fn try_extruded(&self, degree: usize, knots: KnotVector<T>) -> GeometryResult<Self> {
        let mut degrees = self.degrees.clone();
        degrees.push(degree);
        let mut all = self.knots.clone();
        all.push(knots);
        Self::try_new(degrees, all)
    }

    /// Whether two spaces share degrees and knots within the knot tolerance
    pub fn approx_eq(&self, other: &Self) -> bool {
        let tol = knot_tolerance::<T>();
        self.degrees == other.degrees
            && self
                .knots
                .iter()
                .zip(other.knots.iter())
                .all(|(a, b)| a.approx_eq(b, tol))
    }

    /// Cast the function space to another floating point type
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> FunctionSpace<F> {
        FunctionSpace {
            degrees: self.degrees.clone(),
            knots: self.knots.iter().map(|k| k.cast()).collect(),
        }
    }
}

impl<T: FloatingPoint> Reversible for FunctionSpace<T> {
    fn reverse(&mut self, direction: usize) {
        self.knots[direction] = self.knots[direction].reversed();
    }
}

impl<T: FloatingPoint> fmt::Display for FunctionSpace<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "FunctionSpace dimension: {}, degrees: {:?}, numbers: {:?}",
            self.dimension(),
            self.degrees,
            self.numbers()
        )?;
        for (d, k) in self.knots.iter().enumerate() {
            let values: Vec<f64> = k.iter().map(|v| convert_to_f64(*v)).collect();
            writeln!(f, "  knots[{}]: {:?}", d, values)?;
        }
        Ok(())
    }
}

fn convert_to_f64<T: FloatingPoint>(v: T) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}
