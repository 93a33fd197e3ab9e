use nalgebra::{Point3, Vector3};

use crate::error::{GeometryError, GeometryResult};
use crate::grid::{ControlGrid, ControlPoint};
use crate::misc::{scalar, FloatingPoint, Transformable};
use crate::patch::{loft, Patch};
use crate::space::FunctionSpace;
use crate::transformation::Transformation;

/// Coordinate axis normal to the plane of a planar primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

impl Axis {
    pub fn vector<T: FloatingPoint>(&self) -> Vector3<T> {
        match self {
            Axis::X => Vector3::x(),
            Axis::Y => Vector3::y(),
            Axis::Z => Vector3::z(),
        }
    }

    /// Rotation sending the xy plane onto the plane normal to the axis,
    /// after turning it by `angle` degrees about z.
    ///
    /// The polar angle is measured from x in the xy plane, from x in the xz plane
    /// and from y in the yz plane.
    pub fn frame<T: FloatingPoint>(&self, angle: T) -> Transformation<T> {
        let quarter = scalar::<T>(90.);
        match self {
            Axis::Z => Transformation::rotation_z(angle),
            Axis::Y => {
                Transformation::rotation_z(angle).appended(&Transformation::rotation_x(quarter))
            }
            Axis::X => Transformation::rotation_z(angle + quarter)
                .appended(&Transformation::rotation_y(quarter)),
        }
    }
}

/// Straight line from `start` to `end` with equally spaced control points.
///
/// # Example
/// ```
/// use isopatch::prelude::*;
/// use nalgebra::Point3;
///
/// let line = line(&Point3::new(0., 0., 0.), &Point3::new(2., 0., 0.), 2).unwrap();
/// assert_eq!(line.function_space().number(0), 3);
/// let p = line.point_at(&[0.25]).unwrap();
/// assert!((p - Point3::new(0.5, 0., 0.)).norm() < 1e-12);
/// ```
pub fn line<T: FloatingPoint>(
    start: &Point3<T>,
    end: &Point3<T>,
    degree: usize,
) -> GeometryResult<Patch<T>> {
    if degree == 0 {
        return Err(GeometryError::InvalidTopology(
            "a line needs a degree of at least 1".to_string(),
        ));
    }
    Patch::try_new(
        0,
        FunctionSpace::primitive(degree),
        ControlGrid::linear(start, degree + 1, end),
    )
}

/// Open uniform curve with the given points as control points.
pub fn curve<T: FloatingPoint>(points: &[Point3<T>], degree: usize) -> GeometryResult<Patch<T>> {
    let space = FunctionSpace::try_uniform(points.len(), degree)?;
    let grid = ControlGrid::try_new(
        vec![points.len()],
        points
            .iter()
            .map(|p| ControlPoint::from_point(p, T::one()))
            .collect(),
    )?;
    Patch::try_new(0, space, grid)
}

/// Exact circular arc of quadratic degree from `start` to `end` degrees,
/// in the plane normal to `axis`.
/// The sweep must lie strictly between 0 and 180 degrees.
///
/// # Example
/// ```
/// use isopatch::prelude::*;
/// use nalgebra::Point3;
///
/// let arc = small_arc(&Point3::origin(), Axis::Z, 2., 0., 90.).unwrap();
/// let p = arc.point_at(&[0.5]).unwrap();
/// assert!((p.coords.norm() - 2.).abs() < 1e-12);
/// assert!((p.x - p.y).abs() < 1e-12);
/// ```
pub fn small_arc<T: FloatingPoint>(
    center: &Point3<T>,
    axis: Axis,
    radius: T,
    start: T,
    end: T,
) -> GeometryResult<Patch<T>> {
    let sweep = end - start;
    if sweep <= T::zero() || sweep >= scalar(180.) {
        return Err(GeometryError::DegenerateGeometry(format!(
            "an arc sweep of {} degrees is out of (0, 180)",
            sweep.to_f64().unwrap_or(f64::NAN)
        )));
    }
    if radius <= T::zero() {
        return Err(GeometryError::DegenerateGeometry(format!(
            "an arc radius of {} is not positive",
            radius.to_f64().unwrap_or(f64::NAN)
        )));
    }

    // symmetric about the x axis before rotation
    let half = sweep * T::pi() / scalar(360.);
    let w = half.cos();
    let x = radius * w;
    let y = radius * half.sin();
    let apex = x + y * half.tan();
    let mut grid = ControlGrid::try_new(
        vec![3],
        vec![
            ControlPoint::new(x, -y, T::zero(), T::one()),
            ControlPoint::new(apex, T::zero(), T::zero(), w),
            ControlPoint::new(x, y, T::zero(), T::one()),
        ],
    )?;

    let middle = start + sweep / scalar(2.);
    let placement = axis
        .frame(middle)
        .appended(&Transformation::translation(center.x, center.y, center.z));
    grid.try_transform(&placement)?;
    Patch::try_new(0, FunctionSpace::primitive(2), grid)
}

/// Annular sector between the arcs of radius `inner` and `outer`; the arcs run along u.
pub fn small_ring<T: FloatingPoint>(
    center: &Point3<T>,
    axis: Axis,
    inner: T,
    outer: T,
    start: T,
    end: T,
) -> GeometryResult<Patch<T>> {
    let inner = small_arc(center, axis, inner, start, end)?;
    let outer = small_arc(center, axis, outer, start, end)?;
    loft(&[&inner, &outer], 1)
}

/// Bilinear rectangle `[x0, x1] x [y0, y1]` in the plane z = 0
pub fn rectangle<T: FloatingPoint>(x0: T, y0: T, x1: T, y1: T) -> GeometryResult<Patch<T>> {
    let z = T::zero();
    parallelogram(
        &Point3::new(x0, y0, z),
        &Point3::new(x1, y0, z),
        &Point3::new(x1, y1, z),
        &Point3::new(x0, y1, z),
    )
}

/// Bilinear patch over the corners `p1 p2 p3 p4` taken counterclockwise.
/// `p1` sits at the parametric origin and u runs from `p1` to `p2`.
pub fn parallelogram<T: FloatingPoint>(
    p1: &Point3<T>,
    p2: &Point3<T>,
    p3: &Point3<T>,
    p4: &Point3<T>,
) -> GeometryResult<Patch<T>> {
    let bottom = line(p1, p2, 1)?;
    let top = line(p4, p3, 1)?;
    loft(&[&bottom, &top], 1)
}

/// Trilinear box spanned by the corners `min` and `max`
///
/// # Example
/// ```
/// use isopatch::prelude::*;
/// use nalgebra::Point3;
///
/// let slab = slab(&Point3::new(0., 0., 0.), &Point3::new(1., 2., 3.)).unwrap();
/// assert_eq!(slab.dimension(), 3);
/// assert_eq!(slab.point_at(&[1., 1., 1.]).unwrap(), Point3::new(1., 2., 3.));
/// ```
pub fn slab<T: FloatingPoint>(min: &Point3<T>, max: &Point3<T>) -> GeometryResult<Patch<T>> {
    let face = |z: T| {
        parallelogram(
            &Point3::new(min.x, min.y, z),
            &Point3::new(max.x, min.y, z),
            &Point3::new(max.x, max.y, z),
            &Point3::new(min.x, max.y, z),
        )
    };
    let bottom = face(min.z)?;
    let top = face(max.z)?;
    loft(&[&bottom, &top], 1)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn arcs_lie_on_their_circle() {
        let center = Point3::new(1., -2., 0.5);
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let arc = small_arc(&center, axis, 3., 10., 100.).unwrap();
            for i in 0..=10 {
                let p = arc.point_at(&[i as f64 / 10.]).unwrap();
                assert_relative_eq!((p - center).norm(), 3., epsilon = 1e-12);
                assert_relative_eq!((p - center).dot(&axis.vector()), 0., epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn arc_ends_sit_at_the_given_angles() {
        let arc = small_arc(&Point3::origin(), Axis::Z, 1., 30., 120.).unwrap();
        let (s, e) = (30_f64.to_radians(), 120_f64.to_radians());
        assert_relative_eq!(
            arc.point_at(&[0.]).unwrap(),
            Point3::new(s.cos(), s.sin(), 0.),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            arc.point_at(&[1.]).unwrap(),
            Point3::new(e.cos(), e.sin(), 0.),
            epsilon = 1e-12
        );

        // angles in the xz plane start from x
        let arc = small_arc(&Point3::origin(), Axis::Y, 1., 0., 90.).unwrap();
        assert_relative_eq!(arc.point_at(&[1.]).unwrap(), Point3::new(0., 0., 1.), epsilon = 1e-12);
    }

    #[test]
    fn wide_arcs_are_rejected() {
        assert!(small_arc(&Point3::<f64>::origin(), Axis::Z, 1., 0., 180.).is_err());
        assert!(small_arc(&Point3::<f64>::origin(), Axis::Z, 1., 90., 90.).is_err());
        assert!(small_arc(&Point3::<f64>::origin(), Axis::Z, 0., 0., 90.).is_err());
    }

    #[test]
    fn ring_spans_both_radii() {
        let ring = small_ring(&Point3::origin(), Axis::Z, 1., 2., 0., 90.).unwrap();
        assert_eq!(ring.function_space().numbers(), vec![3, 2]);
        assert_relative_eq!(ring.point_at(&[0.5, 0.]).unwrap().coords.norm(), 1., epsilon = 1e-12);
        assert_relative_eq!(ring.point_at(&[0.5, 1.]).unwrap().coords.norm(), 2., epsilon = 1e-12);
        assert_relative_eq!(
            ring.point_at(&[0.5, 0.5]).unwrap().coords.norm(),
            1.5,
            epsilon = 1e-12
        );
    }

    #[test]
    fn quadrilaterals_interpolate_their_corners() {
        let rectangle = rectangle(1., 2., 4., 3.).unwrap();
        assert_eq!(rectangle.point_at(&[0., 0.]).unwrap(), Point3::new(1., 2., 0.));
        assert_eq!(rectangle.point_at(&[1., 0.]).unwrap(), Point3::new(4., 2., 0.));
        assert_eq!(rectangle.point_at(&[0., 1.]).unwrap(), Point3::new(1., 3., 0.));

        let corners = [
            Point3::new(0., 0., 0.),
            Point3::new(2., 0., 0.),
            Point3::new(3., 1., 0.),
            Point3::new(1., 1., 0.),
        ];
        let shape = parallelogram(&corners[0], &corners[1], &corners[2], &corners[3]).unwrap();
        assert_eq!(shape.point_at(&[1., 1.]).unwrap(), corners[2]);
        assert_relative_eq!(
            shape.point_at(&[0.5, 0.5]).unwrap(),
            Point3::new(1.5, 0.5, 0.),
            epsilon = 1e-12
        );
    }

    #[test]
    fn curves_need_enough_points() {
        let points = vec![
            Point3::new(0., 0., 0.),
            Point3::new(1., 1., 0.),
            Point3::new(2., 0., 0.),
        ];
        assert!(curve(&points, 3).is_err());
        let parabola = curve(&points, 2).unwrap();
        assert_relative_eq!(
            parabola.point_at(&[0.5]).unwrap(),
            Point3::new(1., 0.5, 0.),
            epsilon = 1e-12
        );
        assert!(line(&points[0], &points[1], 0).is_err());
    }
}
