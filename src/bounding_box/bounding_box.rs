use nalgebra::{Point3, Vector3};

use crate::misc::{scalar, FloatingPoint};

/// Axis aligned bounding box in 3D space.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundingBox<T: FloatingPoint> {
    min: Vector3<T>,
    max: Vector3<T>,
}

impl<T: FloatingPoint> BoundingBox<T> {
    /// Create a new bounding box from a minimum and maximum point.
    pub fn new(min: Vector3<T>, max: Vector3<T>) -> Self {
        Self {
            min: min.inf(&max),
            max: max.sup(&min),
        }
    }

    /// Create a new bounding box from point iterator, or `None` for no points.
    pub fn new_with_points<I: IntoIterator<Item = Point3<T>>>(iter: I) -> Option<Self> {
        let mut iter = iter.into_iter();
        let first = iter.next()?.coords;
        let (min, max) = iter.fold((first, first), |(min, max), p| {
            (min.inf(&p.coords), max.sup(&p.coords))
        });
        Some(Self { min, max })
    }

    pub fn min(&self) -> &Vector3<T> {
        &self.min
    }

    pub fn max(&self) -> &Vector3<T> {
        &self.max
    }

    pub fn center(&self) -> Point3<T> {
        Point3::from((self.min + self.max) * scalar::<T>(0.5))
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Euclidean distance from a point to the box, zero inside.
    ///
    /// # Examples
    /// ```
    /// use nalgebra::{Point3, Vector3};
    /// use isopatch::prelude::BoundingBox;
    ///
    /// let b = BoundingBox::new(Vector3::from_element(0.), Vector3::from_element(1.));
    /// assert_eq!(b.distance(&Point3::new(0.5, 0.5, 0.5)), 0.);
    /// assert_eq!(b.distance(&Point3::new(3., 0.5, 0.5)), 2.);
    /// ```
    pub fn distance(&self, point: &Point3<T>) -> T {
        let clamped = point.coords.sup(&self.min).inf(&self.max);
        (point.coords - clamped).norm()
    }

    /// Check if the bounding box intersects with another bounding box.
    pub fn intersects(&self, other: &Self) -> bool {
        let tolerance = T::default_epsilon();
        (0..3).all(|i| {
            self.min[i] - tolerance <= other.max[i] && other.min[i] - tolerance <= self.max[i]
        })
    }
}
