use nalgebra::Point3;

use crate::error::GeometryResult;
use crate::interface::make_interface;
use crate::misc::{scalar, FloatingPoint};
use crate::patch::{loft, PatchAccess, PatchPtr};
use crate::refinement::degree_elevate;
use crate::space::{BoundaryDirection, BoundarySide};
use crate::transformation::Transformation;

use super::{line, small_arc, Axis};

/// Options of [`half_circle4`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HalfCircleOptions<T> {
    /// stitch the four patches together
    pub make_interface: bool,
    /// half width of the inner square relative to the radius
    pub square_control: T,
}

impl<T: FloatingPoint> Default for HalfCircleOptions<T> {
    fn default() -> Self {
        Self {
            make_interface: true,
            square_control: T::one() / scalar(3.),
        }
    }
}

/// Half disk of `radius` split into four quadratic patches around an inner square.
///
/// Three patches join the arcs over 0-45, 45-135 and 135-180 degrees to the sides of
/// the square, the fourth fills the square. The whole is rotated by `rotation_angle`
/// degrees about `axis` through the center. Patches get the ids 1 to 4.
///
/// # Example
/// ```
/// use isopatch::prelude::*;
/// use nalgebra::Point3;
///
/// let patches =
///     half_circle4(&Point3::origin(), Axis::Z, 1., 0., &HalfCircleOptions::default()).unwrap();
/// let mut multipatch = MultiPatch::new();
/// for patch in patches {
///     multipatch.add_patch(patch).unwrap();
/// }
/// multipatch.enumerate().unwrap();
/// assert_eq!(multipatch.system_size().unwrap(), 16);
/// ```
pub fn half_circle4<T: FloatingPoint>(
    center: &Point3<T>,
    axis: Axis,
    radius: T,
    rotation_angle: T,
    options: &HalfCircleOptions<T>,
) -> GeometryResult<[PatchPtr<T>; 4]> {
    let arcs = [
        small_arc(center, axis, radius, T::zero(), scalar(45.))?,
        small_arc(center, axis, radius, scalar(45.), scalar(135.))?,
        small_arc(center, axis, radius, scalar(135.), scalar(180.))?,
    ];
    let degree = arcs[0].degree(0);

    // corners of the inner square, laid out in the xy plane then carried onto the plane of the arcs
    let s = options.square_control * radius;
    let frame = axis.frame(T::zero());
    let corner = |x: T, y: T| -> Point3<T> {
        center + frame.apply_vector(&nalgebra::Vector3::new(x, y, T::zero()))
    };
    let p1 = corner(s, T::zero());
    let p2 = corner(s, s);
    let p3 = corner(-s, T::zero());
    let p4 = corner(-s, s);

    let right = line(&p1, &p2, degree)?;
    let top = line(&p2, &p4, degree)?;
    let left = line(&p4, &p3, degree)?;
    let bottom = line(&p1, &p3, degree)?;

    let mut patches = [
        loft(&[&arcs[0], &right], 1)?,
        loft(&[&arcs[1], &top], 1)?,
        loft(&[&arcs[2], &left], 1)?,
        loft(&[&top, &bottom], 1)?,
    ];

    if rotation_angle != T::zero() {
        let rotation = Transformation::translation(-center.x, -center.y, -center.z)
            .appended(&Transformation::rotation(&axis.vector(), rotation_angle))
            .appended(&Transformation::translation(center.x, center.y, center.z));
        for patch in patches.iter_mut() {
            patch.apply_transformation(&rotation)?;
        }
    }
    for (i, patch) in patches.iter_mut().enumerate() {
        patch.set_id(i + 1);
    }

    let [a, b, c, d] = patches.map(|p| p.into_ptr());
    degree_elevate(&d, &[0, degree - 1])?;

    if options.make_interface {
        use BoundaryDirection::*;
        use BoundarySide::*;
        make_interface(&a, U1, &b, U0, Forward)?;
        make_interface(&b, U1, &c, U0, Forward)?;
        make_interface(&a, V1, &d, U0, Reversed)?;
        make_interface(&b, V1, &d, V0, Forward)?;
        make_interface(&c, V1, &d, U1, Forward)?;
    }
    log::debug!(
        "half circle of radius {:?} built from patches {}",
        radius,
        [&a, &b, &c, &d].iter().map(|p| p.patch().name()).collect::<Vec<_>>().join(", ")
    );
    Ok([a, b, c, d])
}
