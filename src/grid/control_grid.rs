use std::fmt;

use nalgebra::{DMatrix, Point3, Vector4};

use crate::error::{GeometryError, GeometryResult};
use crate::misc::{count, FloatingPoint, Reversible, Transformable};
use crate::space::BoundarySide;
use crate::transformation::Transformation;

use super::ControlPoint;

/// Structured array of weighted control points.
/// The linear storage runs fastest along the first direction.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlGrid<T: FloatingPoint> {
    sizes: Vec<usize>,
    points: Vec<ControlPoint<T>>,
}

impl<T: FloatingPoint> ControlGrid<T> {
    /// Create a grid from its extents and points laid out first direction fastest.
    pub fn try_new(sizes: Vec<usize>, points: Vec<ControlPoint<T>>) -> GeometryResult<Self> {
        let expected: usize = sizes.iter().product();
        if sizes.is_empty() || expected != points.len() {
            return Err(GeometryError::TopologyMismatch {
                expected: sizes,
                actual: vec![points.len()],
            });
        }
        Ok(Self { sizes, points })
    }

    /// `n` points evenly spaced from `start` to `end` with unit weights
    /// # Example
    /// ```
    /// use isopatch::prelude::*;
    /// use nalgebra::Point3;
    /// let grid = ControlGrid::linear(&Point3::origin(), 3, &Point3::new(1., 0., 0.));
    /// assert_eq!(grid.sizes(), &[3]);
    /// assert_eq!(grid.get(&[1]).unwrap().wx(), 0.5);
    /// ```
    pub fn linear(start: &Point3<T>, n: usize, end: &Point3<T>) -> Self {
        let points = (0..n)
            .map(|i| {
                let t = if n > 1 {
                    count::<T>(i) / count::<T>(n - 1)
                } else {
                    T::zero()
                };
                ControlPoint::from_point(&Point3::from(start.coords.lerp(&end.coords, t)), T::one())
            })
            .collect();
        Self {
            sizes: vec![n],
            points,
        }
    }

    /// `n_u x n_v` points spanning the rectangle `[x0, x1] x [y0, y1]` in the plane z = 0
    pub fn rectangular(x0: T, y0: T, n_u: usize, n_v: usize, x1: T, y1: T) -> Self {
        Self::cuboid(
            &Point3::new(x0, y0, T::zero()),
            &[n_u, n_v],
            &Point3::new(x1, y1, T::zero()),
        )
    }

    /// Points spanning the axis aligned box from `min` to `max`, one extent per direction.
    /// Directions beyond the extents given keep the `min` coordinate.
    pub fn cuboid(min: &Point3<T>, sizes: &[usize], max: &Point3<T>) -> Self {
        let total: usize = sizes.iter().product();
        let points = (0..total)
            .map(|mut linear| {
                let mut p = *min;
                for (d, n) in sizes.iter().enumerate() {
                    let i = linear % n;
                    linear /= n;
                    if *n > 1 {
                        p[d] = min[d] + (max[d] - min[d]) * count::<T>(i) / count::<T>(n - 1);
                    }
                }
                ControlPoint::from_point(&p, T::one())
            })
            .collect();
        Self {
            sizes: sizes.to_vec(),
            points,
        }
    }

    pub fn dimension(&self) -> usize {
        self.sizes.len()
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn size(&self, direction: usize) -> usize {
        self.sizes[direction]
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[ControlPoint<T>] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ControlPoint<T>> {
        self.points.iter()
    }

    /// Linear index of a structured index, or `None` when out of range
    pub fn linear_index(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.sizes.len() {
            return None;
        }
        let mut stride = 1;
        let mut linear = 0;
        for (i, n) in index.iter().zip(self.sizes.iter()) {
            if i >= n {
                return None;
            }
            linear += i * stride;
            stride *= n;
        }
        Some(linear)
    }

    /// Linear index of a structured index known to be in range
    fn offset(&self, index: &[usize]) -> usize {
        index
            .iter()
            .zip(self.sizes.iter())
            .rev()
            .fold(0, |acc, (i, n)| acc * n + i)
    }

    pub fn get(&self, index: &[usize]) -> Option<&ControlPoint<T>> {
        self.linear_index(index).map(|i| &self.points[i])
    }

    pub fn get_linear(&self, index: usize) -> Option<&ControlPoint<T>> {
        self.points.get(index)
    }

    pub fn set(&mut self, index: &[usize], point: ControlPoint<T>) -> GeometryResult<()> {
        let linear = self
            .linear_index(index)
            .ok_or_else(|| GeometryError::TopologyMismatch {
                expected: self.sizes.clone(),
                actual: index.to_vec(),
            })?;
        self.points[linear] = point;
        Ok(())
    }

    pub fn set_linear(&mut self, index: usize, point: ControlPoint<T>) -> GeometryResult<()> {
        let len = self.points.len();
        let slot = self
            .points
            .get_mut(index)
            .ok_or_else(|| GeometryError::TopologyMismatch {
                expected: vec![len],
                actual: vec![index],
            })?;
        *slot = point;
        Ok(())
    }

    /// Cartesian positions of every control point
    pub fn positions(&self) -> GeometryResult<Vec<Point3<T>>> {
        self.points.iter().map(|p| p.position()).collect()
    }

    /// Apply a coefficient matrix along `direction`.
    ///
    /// Every line of points along `direction` is replaced by `matrix` times that line,
    /// so the extent in `direction` becomes `matrix.nrows()`.
    /// The matrix must have as many columns as the current extent.
    pub fn transform_along(&self, direction: usize, matrix: &DMatrix<T>) -> Self {
        let old_n = self.sizes[direction];
        let new_n = matrix.nrows();
        let stride: usize = self.sizes[..direction].iter().product();
        let outer: usize = self.sizes[direction + 1..].iter().product();

        let mut sizes = self.sizes.clone();
        sizes[direction] = new_n;
        let mut points = Vec::with_capacity(stride * new_n * outer);
        for o in 0..outer {
            for r in 0..new_n {
                for inner in 0..stride {
                    let h = (0..old_n).fold(Vector4::zeros(), |acc: Vector4<T>, k| {
                        let c = matrix[(r, k)];
                        if c == T::zero() {
                            acc
                        } else {
                            acc + self.points[inner + stride * (k + old_n * o)].homogeneous() * c
                        }
                    });
                    points.push(ControlPoint::from_homogeneous(h));
                }
            }
        }

        Self { sizes, points }
    }

    /// The control points lying on a boundary side as a grid of one direction less.
    pub fn boundary(&self, side: BoundarySide) -> GeometryResult<Self> {
        let dimension = self.dimension();
        if dimension < 2 || !side.is_valid_for(dimension) {
            return Err(GeometryError::InvalidTopology(format!(
                "a {}-dimensional grid has no boundary grid on {}",
                dimension, side
            )));
        }
        let fixed = if side.is_max() {
            self.sizes[side.direction()] - 1
        } else {
            0
        };
        let tangential = side.tangential_directions(dimension);
        let sizes: Vec<usize> = tangential.iter().map(|d| self.sizes[*d]).collect();
        let total: usize = sizes.iter().product();
        let points = (0..total)
            .map(|mut local| {
                let mut index = vec![0; dimension];
                index[side.direction()] = fixed;
                for d in tangential.iter() {
                    index[*d] = local % self.sizes[*d];
                    local /= self.sizes[*d];
                }
                self.points[self.offset(&index)]
            })
            .collect();
        Ok(Self { sizes, points })
    }

    /// Stack grids of equal extents along a new last direction.
    pub fn try_stacked(sections: &[ControlGrid<T>]) -> GeometryResult<Self> {
        let first = sections.first().ok_or_else(|| {
            GeometryError::InvalidTopology("no sections to stack".to_string())
        })?;
        if let Some(other) = sections.iter().find(|s| s.sizes != first.sizes) {
            return Err(GeometryError::TopologyMismatch {
                expected: first.sizes.clone(),
                actual: other.sizes.clone(),
            });
        }
        let mut sizes = first.sizes.clone();
        sizes.push(sections.len());
        let points = sections
            .iter()
            .flat_map(|s| s.points.iter().copied())
            .collect();
        Ok(Self { sizes, points })
    }
}

impl<T: FloatingPoint> Reversible for ControlGrid<T> {
    fn reverse(&mut self, direction: usize) {
        let n = self.sizes[direction];
        let mut m = DMatrix::zeros(n, n);
        for i in 0..n {
            m[(i, n - 1 - i)] = T::one();
        }
        *self = self.transform_along(direction, &m);
    }
}

impl<'a, T: FloatingPoint> Transformable<&'a Transformation<T>> for ControlGrid<T> {
    /// Every point is transformed into a scratch buffer first;
    /// the grid is only rewritten once all of them succeed.
    fn try_transform(&mut self, transform: &'a Transformation<T>) -> GeometryResult<()> {
        let points = self
            .points
            .iter()
            .map(|p| p.try_transformed(transform))
            .collect::<GeometryResult<Vec<_>>>()?;
        self.points = points;
        Ok(())
    }
}

impl<T: FloatingPoint> fmt::Display for ControlGrid<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ControlGrid sizes: {:?}", self.sizes)?;
        for (i, p) in self.points.iter().enumerate() {
            let h = p.homogeneous();
            writeln!(
                f,
                "  {}: ({:?}, {:?}, {:?}, {:?})",
                i,
                h.x.to_f64().unwrap_or(f64::NAN),
                h.y.to_f64().unwrap_or(f64::NAN),
                h.z.to_f64().unwrap_or(f64::NAN),
                h.w.to_f64().unwrap_or(f64::NAN)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, Matrix4, Point3};

    use super::*;

    #[test]
    fn rectangular_grid_interpolates_corners() {
        let grid = ControlGrid::rectangular(0., 0., 4, 3, 1., 2.);
        assert_eq!(grid.sizes(), &[4, 3]);
        let p = grid.get(&[1, 2]).unwrap().position().unwrap();
        assert_relative_eq!(p, Point3::new(1. / 3., 2., 0.), epsilon = 1e-14);
        assert!(grid.get(&[4, 0]).is_none());
    }

    #[test]
    fn set_rejects_out_of_range_index() {
        let mut grid = ControlGrid::rectangular(0., 0., 2, 2, 1., 1.);
        let p = ControlPoint::new(5., 5., 5., 1.);
        assert!(grid.set(&[2, 0], p).is_err());
        assert!(grid.set(&[1, 1], p).is_ok());
        assert_eq!(grid.get_linear(3), Some(&p));
    }

    #[test]
    fn try_new_checks_point_count() {
        let points = vec![ControlPoint::new(0., 0., 0., 1.); 5];
        assert!(matches!(
            ControlGrid::try_new(vec![2, 3], points),
            Err(GeometryError::TopologyMismatch { .. })
        ));
    }

    #[test]
    fn transform_along_second_direction() {
        let grid = ControlGrid::rectangular(0., 0., 2, 2, 1., 1.);
        // duplicate the middle of each column
        let m = DMatrix::from_row_slice(3, 2, &[1., 0., 0.5, 0.5, 0., 1.]);
        let refined = grid.transform_along(1, &m);
        assert_eq!(refined.sizes(), &[2, 3]);
        let p = refined.get(&[1, 1]).unwrap().position().unwrap();
        assert_relative_eq!(p, Point3::new(1., 0.5, 0.), epsilon = 1e-14);
    }

    #[test]
    fn reverse_and_boundary() {
        let grid = ControlGrid::rectangular(0., 0., 3, 2, 2., 1.);
        let rev = grid.reversed(0);
        assert_relative_eq!(rev.get(&[0, 0]).unwrap().wx(), 2.);
        let top = grid.boundary(BoundarySide::TOP).unwrap();
        assert_eq!(top.sizes(), &[3]);
        assert_relative_eq!(top.get(&[2]).unwrap().position().unwrap(), Point3::new(2., 1., 0.));
        let right = grid.boundary(BoundarySide::RIGHT).unwrap();
        assert_eq!(right.sizes(), &[2]);
    }

    #[test]
    fn transformation_is_atomic() {
        let mut grid = ControlGrid::linear(&Point3::origin(), 3, &Point3::new(2., 0., 0.));
        // a projective map sending x = 1 to infinity
        let mut m = Matrix4::identity();
        m[(3, 0)] = -1.;
        let before = grid.clone();
        assert!(grid.try_transform(&Transformation::from_matrix(m)).is_err());
        assert_eq!(grid, before);

        grid.try_transform(&Transformation::translation(0., 0., 1.)).unwrap();
        assert_relative_eq!(grid.get(&[2]).unwrap().wz(), 1.);
    }

    #[test]
    fn stacking_needs_equal_sections() {
        let a = ControlGrid::linear(&Point3::origin(), 3, &Point3::new(1., 0., 0.));
        let b = ControlGrid::linear(&Point3::new(0., 1., 0.), 3, &Point3::new(1., 1., 0.));
        let c = ControlGrid::linear(&Point3::new(0., 2., 0.), 2, &Point3::new(1., 2., 0.));
        let stacked = ControlGrid::try_stacked(&[a.clone(), b]).unwrap();
        assert_eq!(stacked.sizes(), &[3, 2]);
        assert!(ControlGrid::try_stacked(&[a, c]).is_err());
    }
}
