use std::ops::Mul;

use nalgebra::{Matrix4, Point3, Rotation3, Unit, Vector3, Vector4};

use crate::misc::{scalar, FloatingPoint};

/// Affine transformation in homogeneous coordinates.
///
/// Transformations compose by appending: `a.appended(&b)` applies `a` first, then `b`.
///
/// # Example
/// ```
/// use isopatch::prelude::*;
/// use nalgebra::Point3;
///
/// let t = Transformation::rotation_z(90.).appended(&Transformation::translation(1., 0., 0.));
/// let p = t.apply(&Point3::new(1., 0., 0.)).unwrap();
/// assert!((p - Point3::new(1., 1., 0.)).norm() < 1e-12);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transformation<T: FloatingPoint> {
    matrix: Matrix4<T>,
}

impl<T: FloatingPoint> Default for Transformation<T> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<T: FloatingPoint> Transformation<T> {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    pub fn from_matrix(matrix: Matrix4<T>) -> Self {
        Self { matrix }
    }

    pub fn translation(dx: T, dy: T, dz: T) -> Self {
        Self {
            matrix: Matrix4::new_translation(&Vector3::new(dx, dy, dz)),
        }
    }

    /// Rotation by `degrees` about an axis through the origin
    pub fn rotation(axis: &Vector3<T>, degrees: T) -> Self {
        let angle = degrees * T::pi() / scalar(180.);
        let rotation = Rotation3::from_axis_angle(&Unit::new_normalize(*axis), angle);
        Self {
            matrix: rotation.to_homogeneous(),
        }
    }

    pub fn rotation_x(degrees: T) -> Self {
        Self::rotation(&Vector3::x(), degrees)
    }

    pub fn rotation_y(degrees: T) -> Self {
        Self::rotation(&Vector3::y(), degrees)
    }

    pub fn rotation_z(degrees: T) -> Self {
        Self::rotation(&Vector3::z(), degrees)
    }

    /// Map the local frame `(b, n, t)` anchored at `origin` into global coordinates.
    /// The local x, y and z axes are sent to `b`, `n` and `t`.
    pub fn from_frame(b: &Vector3<T>, n: &Vector3<T>, t: &Vector3<T>, origin: &Point3<T>) -> Self {
        let mut matrix = Matrix4::identity();
        for i in 0..3 {
            matrix[(i, 0)] = b[i];
            matrix[(i, 1)] = n[i];
            matrix[(i, 2)] = t[i];
            matrix[(i, 3)] = origin[i];
        }
        Self { matrix }
    }

    pub fn matrix(&self) -> &Matrix4<T> {
        &self.matrix
    }

    /// Compose `other` after this transformation
    pub fn append(&mut self, other: &Self) {
        self.matrix = other.matrix * self.matrix;
    }

    pub fn appended(&self, other: &Self) -> Self {
        let mut t = self.clone();
        t.append(other);
        t
    }

    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }

    /// Transform a point, or `None` if it is sent to infinity.
    pub fn apply(&self, point: &Point3<T>) -> Option<Point3<T>> {
        let h = self.matrix * Vector4::new(point.x, point.y, point.z, T::one());
        if h.w == T::zero() {
            return None;
        }
        Some(Point3::new(h.x / h.w, h.y / h.w, h.z / h.w))
    }

    /// Transform a direction, ignoring the translation part.
    pub fn apply_vector(&self, vector: &Vector3<T>) -> Vector3<T> {
        self.matrix.fixed_view::<3, 3>(0, 0) * vector
    }
}

impl<T: FloatingPoint> Mul for &Transformation<T> {
    type Output = Transformation<T>;

    /// `a * b` applies `b` first, as with matrices.
    fn mul(self, rhs: Self) -> Self::Output {
        Transformation::from_matrix(self.matrix * rhs.matrix)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    use super::Transformation;

    #[test]
    fn rotations_use_degrees() {
        let p = Point3::new(0., 1., 0.);
        let q = Transformation::rotation_x(90.).apply(&p).unwrap();
        assert_relative_eq!(q, Point3::new(0., 0., 1.), epsilon = 1e-12);
        let q = Transformation::rotation_y(180.).apply(&Point3::new(1., 0., 0.)).unwrap();
        assert_relative_eq!(q, Point3::new(-1., 0., 0.), epsilon = 1e-12);
    }

    #[test]
    fn append_applies_in_order() {
        let mut t = Transformation::translation(1., 0., 0.);
        t.append(&Transformation::rotation_z(90.));
        let q = t.apply(&Point3::origin()).unwrap();
        assert_relative_eq!(q, Point3::new(0., 1., 0.), epsilon = 1e-12);

        let product = &Transformation::rotation_z(90.) * &Transformation::translation(1., 0., 0.);
        assert_relative_eq!(product.matrix(), t.matrix(), epsilon = 1e-12);
    }

    #[test]
    fn frame_and_inverse() {
        let t = Transformation::from_frame(
            &Vector3::y(),
            &Vector3::z(),
            &Vector3::x(),
            &Point3::new(1., 2., 3.),
        );
        let q = t.apply(&Point3::new(1., 0., 0.)).unwrap();
        assert_relative_eq!(q, Point3::new(1., 3., 3.), epsilon = 1e-12);
        let back = t.inverse().unwrap().apply(&q).unwrap();
        assert_relative_eq!(back, Point3::new(1., 0., 0.), epsilon = 1e-12);
        assert_relative_eq!(t.apply_vector(&Vector3::z()), Vector3::x(), epsilon = 1e-12);
    }
}
