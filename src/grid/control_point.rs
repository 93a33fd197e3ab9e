use nalgebra::{Point3, Vector4};

use crate::error::{GeometryError, GeometryResult};
use crate::misc::{FloatingPoint, Transformable};
use crate::transformation::Transformation;

/// Weighted control point stored in homogeneous form `(w x, w y, w z, w)`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlPoint<T: FloatingPoint>(Vector4<T>);

impl<T: FloatingPoint> ControlPoint<T> {
    /// Create a control point from cartesian coordinates and a weight.
    /// # Example
    /// ```
    /// use isopatch::prelude::ControlPoint;
    /// let p = ControlPoint::new(1., 2., 3., 0.5);
    /// assert_eq!(p.wx(), 0.5);
    /// assert_eq!(p.position().unwrap().y, 2.);
    /// ```
    pub fn new(x: T, y: T, z: T, w: T) -> Self {
        Self(Vector4::new(x * w, y * w, z * w, w))
    }

    pub fn from_point(point: &Point3<T>, weight: T) -> Self {
        Self::new(point.x, point.y, point.z, weight)
    }

    /// Create a control point from already weighted coordinates
    pub fn from_homogeneous(homogeneous: Vector4<T>) -> Self {
        Self(homogeneous)
    }

    pub fn homogeneous(&self) -> &Vector4<T> {
        &self.0
    }

    pub fn wx(&self) -> T {
        self.0.x
    }

    pub fn wy(&self) -> T {
        self.0.y
    }

    pub fn wz(&self) -> T {
        self.0.z
    }

    pub fn weight(&self) -> T {
        self.0.w
    }

    /// Cartesian position, failing for a vanishing weight.
    pub fn position(&self) -> GeometryResult<Point3<T>> {
        let w = self.0.w;
        if w == T::zero() {
            return Err(GeometryError::DegenerateGeometry(
                "control point with zero weight".to_string(),
            ));
        }
        Ok(Point3::new(self.0.x / w, self.0.y / w, self.0.z / w))
    }
}

impl<'a, T: FloatingPoint> Transformable<&'a Transformation<T>> for ControlPoint<T> {
    fn try_transform(&mut self, transform: &'a Transformation<T>) -> GeometryResult<()> {
        let position = self.position()?;
        let moved = transform.apply(&position).ok_or_else(|| {
            GeometryError::DegenerateGeometry(
                "transformation sends a control point to infinity".to_string(),
            )
        })?;
        *self = Self::from_point(&moved, self.weight());
        Ok(())
    }
}
