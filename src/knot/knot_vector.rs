use std::fmt;
use std::ops::Index;

use nalgebra::{convert, DMatrix};
use simba::scalar::SupersetOf;

use crate::error::{GeometryError, GeometryResult};
use crate::misc::{count, knot_tolerance, FloatingPoint};

use super::KnotMultiplicity;

/// Knot vector representation
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KnotVector<T>(Vec<T>);

impl<T: FloatingPoint> KnotVector<T> {
    pub fn new(knots: Vec<T>) -> Self {
        Self(knots)
    }

    /// Create an open uniform knot vector on [0, 1] for `n` basis functions of `degree`.
    /// The end knots are repeated `degree + 1` times and the interior knots are evenly spaced.
    /// # Example
    /// ```
    /// use isopatch::prelude::KnotVector;
    /// let knots: KnotVector<f64> = KnotVector::open_uniform(5, 2);
    /// assert_eq!(knots.to_vec(), vec![0., 0., 0., 1. / 3., 2. / 3., 1., 1., 1.]);
    /// ```
    pub fn open_uniform(n: usize, degree: usize) -> Self {
        let segments = n.saturating_sub(degree).max(1);
        let mut knots = vec![T::zero(); degree + 1];
        for i in 1..segments {
            knots.push(count::<T>(i) / count::<T>(segments));
        }
        knots.extend(std::iter::repeat(T::one()).take(degree + 1));
        Self(knots)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.0.clone()
    }

    pub fn first(&self) -> T {
        self.0[0]
    }

    pub fn last(&self) -> T {
        self.0[self.0.len() - 1]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    /// Number of basis functions of `degree` spanned by the knots
    pub fn number_of_basis(&self, degree: usize) -> usize {
        self.len().saturating_sub(degree + 1)
    }

    /// Get the domain of the knot vector by degree
    pub fn domain(&self, degree: usize) -> (T, T) {
        (self.0[degree], self.0[self.0.len() - 1 - degree])
    }

    pub fn clamp(&self, degree: usize, u: T) -> T {
        let (min, max) = self.domain(degree);
        u.clamp(min, max)
    }

    /// Returns the index of the last knot less than or equal to knot
    pub fn floor(&self, knot: T) -> Option<usize> {
        self.iter().rposition(|t| *t <= knot)
    }

    /// Get the multiplicity of each knot
    /// # Example
    /// ```
    /// use isopatch::prelude::KnotVector;
    /// let knots = KnotVector::new(vec![0., 0., 0., 1., 2., 3., 3., 3.]);
    /// let knot_multiplicity = knots.multiplicity();
    /// assert_eq!(knot_multiplicity[0].multiplicity(), 3);
    /// assert_eq!(knot_multiplicity[1].multiplicity(), 1);
    /// assert_eq!(knot_multiplicity[3].multiplicity(), 3);
    /// ```
    pub fn multiplicity(&self) -> Vec<KnotMultiplicity<T>> {
        let mut mult = vec![];
        let Some(first) = self.0.first() else {
            return mult;
        };

        let tol = knot_tolerance::<T>();
        let mut current = KnotMultiplicity::new(*first, 0);
        self.0.iter().for_each(|knot| {
            if (*knot - current.knot()).abs() > tol {
                mult.push(current);
                current = KnotMultiplicity::new(*knot, 0);
            }
            current.increment_multiplicity();
        });
        mult.push(current);

        mult
    }

    /// Number of knots equal to `knot` within the knot tolerance
    pub fn multiplicity_of(&self, knot: T) -> usize {
        let tol = knot_tolerance::<T>();
        self.iter().filter(|k| (**k - knot).abs() <= tol).count()
    }

    /// Distinct knots strictly inside the domain with their multiplicities
    pub fn interior_multiplicity(&self) -> Vec<KnotMultiplicity<T>> {
        let mult = self.multiplicity();
        if mult.len() < 2 {
            return vec![];
        }
        mult[1..mult.len() - 1].to_vec()
    }

    /// Check if the knot vector is open for the degree,
    /// i.e. the first and last knots appear exactly `degree + 1` times.
    pub fn is_open(&self, degree: usize) -> bool {
        let multiplicity = self.multiplicity();
        match (multiplicity.first(), multiplicity.last()) {
            (Some(start), Some(end)) if multiplicity.len() > 1 => {
                start.multiplicity() == degree + 1 && end.multiplicity() == degree + 1
            }
            _ => false,
        }
    }

    /// Check the knot vector against the open knot vector convention for `degree`.
    pub fn validate(&self, degree: usize) -> GeometryResult<()> {
        if self.len() < 2 * (degree + 1) {
            return Err(GeometryError::InvalidTopology(format!(
                "a knot vector of degree {} needs at least {} knots, got {}",
                degree,
                2 * (degree + 1),
                self.len()
            )));
        }
        if self.0.windows(2).any(|w| w[1] < w[0]) {
            return Err(GeometryError::InvalidTopology(
                "knot vector must be non-decreasing".to_string(),
            ));
        }
        if !self.is_open(degree) {
            return Err(GeometryError::InvalidTopology(format!(
                "end knots must be repeated exactly {} times",
                degree + 1
            )));
        }
        if let Some(m) = self
            .interior_multiplicity()
            .into_iter()
            .find(|m| m.multiplicity() > degree)
        {
            return Err(GeometryError::InvalidTopology(format!(
                "interior knot {} has multiplicity {} above degree {}",
                m.knot(),
                m.multiplicity(),
                degree
            )));
        }
        Ok(())
    }

    /// Find the knot span index by binary search
    ///
    /// # Example
    /// ```
    /// use isopatch::prelude::KnotVector;
    /// let knots = KnotVector::new(vec![0., 0., 0., 1., 2., 3., 3., 3.]);
    /// let idx = knots.find_knot_span_index(4, 2, 2.5);
    /// assert_eq!(idx, 4);
    /// ```
    pub fn find_knot_span_index(&self, n: usize, degree: usize, u: T) -> usize {
        if u >= self[n + 1] {
            return n;
        }

        if u <= self[degree] {
            return degree;
        }

        // binary search
        let mut low = degree;
        let mut high = n + 1;
        let mut mid = (low + high) / 2;
        while u < self[mid] || self[mid + 1] <= u {
            if u < self[mid] {
                high = mid;
            } else {
                low = mid;
            }
            let next = (low + high) / 2;
            if mid == next {
                break;
            }
            mid = next;
        }

        mid
    }

    /// Compute the non-vanishing basis functions and their derivatives.
    /// Row `k` of the result holds the `k`th derivatives of the `degree + 1` functions
    /// supported on `knot_index`, up to `order` derivatives.
    pub fn derivative_basis_functions(
        &self,
        knot_index: usize,
        u: T,
        degree: usize,
        order: usize,
    ) -> Vec<Vec<T>> {
        let mut ndu = vec![vec![T::zero(); degree + 1]; degree + 1];
        let mut left = vec![T::zero(); degree + 1];
        let mut right = vec![T::zero(); degree + 1];

        ndu[0][0] = T::one();

        for j in 1..=degree {
            left[j] = u - self[knot_index + 1 - j];
            right[j] = self[knot_index + j] - u;

            let mut saved = T::zero();
            for r in 0..j {
                // lower triangle
                ndu[j][r] = right[r + 1] + left[j - r];
                let temp = ndu[r][j - 1] / ndu[j][r];

                // upper triangle
                ndu[r][j] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            ndu[j][j] = saved;
        }

        let mut ders = vec![vec![T::zero(); degree + 1]; order + 1];
        let mut a = vec![vec![T::zero(); degree + 1]; 2];

        for j in 0..=degree {
            ders[0][j] = ndu[j][degree];
        }

        let idegree = degree as isize;
        let iorder = order.min(degree) as isize;

        for r in 0..=idegree {
            // alternate rows in array a
            let mut s1 = 0;
            let mut s2 = 1;
            a[0][0] = T::one();

            for k in 1..=iorder {
                let mut d = T::zero();
                let rk = r - k;
                let pk = idegree - k;

                if r >= k {
                    a[s2][0] = a[s1][0] / ndu[(pk + 1) as usize][rk as usize];
                    d = a[s2][0] * ndu[rk as usize][pk as usize];
                }

                let j1 = if rk >= -1 { 1 } else { -rk };
                let j2 = if r - 1 <= pk { k - 1 } else { idegree - r };

                for j in j1..=j2 {
                    a[s2][j as usize] = (a[s1][j as usize] - a[s1][j as usize - 1])
                        / ndu[(pk + 1) as usize][(rk + j) as usize];
                    d += a[s2][j as usize] * ndu[(rk + j) as usize][pk as usize];
                }

                let uk = k as usize;
                let ur = r as usize;
                if r <= pk {
                    a[s2][uk] = -a[s1][(k - 1) as usize] / ndu[(pk + 1) as usize][ur];
                    d += a[s2][uk] * ndu[ur][pk as usize];
                }

                ders[uk][ur] = d;

                std::mem::swap(&mut s1, &mut s2);
            }
        }

        let mut acc = idegree;
        for k in 1..=iorder {
            for j in 0..=idegree {
                ders[k as usize][j as usize] *= count::<T>(acc as usize);
            }
            acc *= idegree - k;
        }
        ders
    }

    /// Reflect the knot vector so that the parametrization runs backwards,
    /// mapping every knot `k` to `first + last - k`.
    /// # Example
    /// ```
    /// use isopatch::prelude::KnotVector;
    /// let knots = KnotVector::new(vec![0., 0., 0., 0.25, 1., 1., 1.]);
    /// assert_eq!(knots.reversed().to_vec(), vec![0., 0., 0., 0.75, 1., 1., 1.]);
    /// ```
    pub fn reversed(&self) -> Self {
        let (a, b) = (self.first(), self.last());
        Self(self.0.iter().rev().map(|k| a + b - *k).collect())
    }

    /// Compare two knot vectors value by value within `tolerance`
    pub fn approx_eq(&self, other: &Self, tolerance: T) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(a, b)| (*a - *b).abs() <= tolerance)
    }

    /// Insert a single knot with Boehm's algorithm.
    ///
    /// Returns the refined knot vector and the `(n + 1) x n` matrix whose rows express
    /// the new control points as combinations of the old ones. `knot` must lie strictly
    /// inside the knot range; multiplicity limits are checked by the caller.
    pub fn insertion_matrix(&self, degree: usize, knot: T) -> (Self, DMatrix<T>) {
        let n = self.number_of_basis(degree);
        let k = self.floor(knot).unwrap_or(degree).min(self.len() - degree - 2);
        let mut m = DMatrix::zeros(n + 1, n);
        for i in 0..=n {
            if i + degree <= k {
                m[(i, i)] = T::one();
            } else if i > k {
                m[(i, i - 1)] = T::one();
            } else {
                let alpha = (knot - self[i]) / (self[i + degree] - self[i]);
                m[(i, i)] = alpha;
                m[(i, i - 1)] = T::one() - alpha;
            }
        }

        let mut knots = self.0.clone();
        knots.insert(k + 1, knot);
        (Self(knots), m)
    }

    /// Insert several knots one after another, composing the coefficient matrices.
    /// The knots are inserted in ascending order.
    ///
    /// # Example
    /// ```
    /// use isopatch::prelude::KnotVector;
    /// let knots = KnotVector::new(vec![0., 0., 0., 0., 1., 1., 1., 1.]);
    /// let (refined, m) = knots.refinement_matrix(3, &[0.5]);
    /// assert_eq!(refined.to_vec(), vec![0., 0., 0., 0., 0.5, 1., 1., 1., 1.]);
    /// assert_eq!(m.shape(), (5, 4));
    /// ```
    pub fn refinement_matrix(&self, degree: usize, knots: &[T]) -> (Self, DMatrix<T>) {
        let mut sorted = knots.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = self.number_of_basis(degree);
        sorted
            .into_iter()
            .fold((self.clone(), DMatrix::identity(n, n)), |(kv, acc), knot| {
                let (next, m) = kv.insertion_matrix(degree, knot);
                (next, m * acc)
            })
    }

    /// Cast the knot vector to another floating point type
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> KnotVector<F> {
        KnotVector::new(self.0.iter().map(|v| convert(*v)).collect())
    }
}

impl<T> Index<usize> for KnotVector<T> {
    type Output = T;
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<T> FromIterator<T> for KnotVector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T: fmt::Display> fmt::Display for KnotVector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, k) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", k)?;
        }
        write!(f, "]")
    }
}
