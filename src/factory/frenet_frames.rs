use nalgebra::Vector3;

use crate::error::{GeometryError, GeometryResult};
use crate::misc::{count, FloatingPoint};
use crate::patch::Patch;
use crate::transformation::Transformation;

/// `n` local frames evenly spaced in parameter along a curve.
///
/// Each frame sends local z to the unit tangent and local x to the binormal.
/// The first binormal is `up x tangent`; the next ones are carried along by
/// projecting the previous binormal off the new tangent, so the frames do not twist.
///
/// # Example
/// ```
/// use isopatch::prelude::*;
/// use nalgebra::{Point3, Vector3};
///
/// let line = line(&Point3::origin(), &Point3::new(0., 0., 2.), 1).unwrap();
/// let frames = local_frenet_frames(&line, 3, &Vector3::x()).unwrap();
/// assert_eq!(frames[1].apply(&Point3::origin()).unwrap(), Point3::new(0., 0., 1.));
/// assert_eq!(frames[1].apply_vector(&Vector3::z()), Vector3::z());
/// ```
pub fn local_frenet_frames<T: FloatingPoint>(
    curve: &Patch<T>,
    n: usize,
    up: &Vector3<T>,
) -> GeometryResult<Vec<Transformation<T>>> {
    if curve.dimension() != 1 {
        return Err(GeometryError::InvalidTopology(format!(
            "frames need a curve, {} has dimension {}",
            curve.name(),
            curve.dimension()
        )));
    }
    if n < 2 {
        return Err(GeometryError::InvalidTopology(format!(
            "at least 2 frames are needed, {} requested",
            n
        )));
    }

    let (a, b) = curve.function_space().domain(0);
    let degenerate = |what: &str, xi: T| {
        GeometryError::DegenerateGeometry(format!(
            "{} of {} vanishes at {}",
            what,
            curve.name(),
            xi.to_f64().unwrap_or(f64::NAN)
        ))
    };

    let mut frames = Vec::with_capacity(n);
    let mut binormal = *up;
    for i in 0..n {
        let xi = a + (b - a) * count::<T>(i) / count::<T>(n - 1);
        let e = curve.evaluate(&[xi])?;
        let tangent = e.first[0]
            .try_normalize(T::default_epsilon())
            .ok_or_else(|| degenerate("tangent", xi))?;
        let projected = if i == 0 {
            up.cross(&tangent)
        } else {
            binormal - tangent * binormal.dot(&tangent)
        };
        binormal = projected
            .try_normalize(T::default_epsilon())
            .ok_or_else(|| degenerate("binormal", xi))?;
        let normal = tangent.cross(&binormal);
        frames.push(Transformation::from_frame(&binormal, &normal, &tangent, &e.point));
    }
    Ok(frames)
}
