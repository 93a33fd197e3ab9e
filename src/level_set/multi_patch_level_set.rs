use std::fmt;

use argmin::core::ArgminFloat;
use nalgebra::Point3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::closest_parameter::ClosestParameterOptions;
use crate::error::{GeometryError, GeometryResult};
use crate::misc::FloatingPoint;
use crate::multipatch::MultiPatch;
use crate::patch::{normal_of, Patch, PatchAccess};
use crate::space::BoundarySide;

/// Signed distance from a point to the geometry of a multipatch.
///
/// Curves and surfaces are signed by their normal: the tangent turned clockwise about z
/// for curves, the cross product of the tangents for surfaces. Points on the side the
/// normal points to are positive, points on the tangent plane count as positive.
/// Volumes are signed by containment: negative inside, positive outside, the magnitude
/// being the distance to their free boundary faces.
///
/// # Example
/// ```
/// use isopatch::prelude::*;
/// use nalgebra::Point3;
///
/// let square = Patch::try_new(
///     1,
///     FunctionSpace::rectangular(1, 1),
///     ControlGrid::rectangular(0., 0., 2, 2, 1., 1.),
/// ).unwrap().into_ptr();
/// let mut multipatch = MultiPatch::new();
/// multipatch.add_patch(square).unwrap();
///
/// let level_set = MultiPatchLevelSet::new(&multipatch);
/// let above = level_set.value(&Point3::new(0.5, 0.5, 2.)).unwrap();
/// let below = level_set.value(&Point3::new(0.5, 0.5, -2.)).unwrap();
/// assert!((above - 2.).abs() < 1e-10);
/// assert!((below + 2.).abs() < 1e-10);
/// ```
pub struct MultiPatchLevelSet<'a, T: FloatingPoint> {
    multipatch: &'a MultiPatch<T>,
    options: ClosestParameterOptions<T>,
    echo_level: usize,
}

/// Nearest point found on one patch
#[derive(Clone, Copy, Debug)]
struct Candidate<T> {
    distance: T,
    positive: bool,
}

impl<'a, T: FloatingPoint + ArgminFloat> MultiPatchLevelSet<'a, T> {
    pub fn new(multipatch: &'a MultiPatch<T>) -> Self {
        Self {
            multipatch,
            options: ClosestParameterOptions::default(),
            echo_level: 0,
        }
    }

    pub fn with_options(mut self, options: ClosestParameterOptions<T>) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ClosestParameterOptions<T> {
        &self.options
    }

    /// Verbosity of the diagnostic logging: 0 is silent, 1 logs every query, 2 every patch visited.
    pub fn set_echo_level(&mut self, echo_level: usize) {
        self.echo_level = echo_level;
    }

    pub fn echo_level(&self) -> usize {
        self.echo_level
    }

    /// Signed distance from `point` to the geometry
    pub fn value(&self, point: &Point3<T>) -> GeometryResult<T> {
        let mut order = Vec::with_capacity(self.multipatch.len());
        for patch in self.multipatch.iter() {
            let distance = patch.patch().bounding_box()?.distance(point);
            order.push((distance, patch.clone()));
        }
        order.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut best: Option<Candidate<T>> = None;
        let mut has_volume = false;
        let mut inside = false;
        for (bound, patch) in order.iter() {
            let guard = patch.patch();
            let is_volume = guard.dimension() == 3;
            if is_volume {
                has_volume = true;
                if !inside && *bound <= T::zero() {
                    inside = self.contains(&guard, point)?;
                }
            }
            // the control points enclose the patch, so nothing closer can be found here
            if best.as_ref().is_some_and(|b| *bound > b.distance) {
                continue;
            }

            let candidate = if is_volume {
                self.face_candidate(&guard, point)?
            } else {
                Some(self.boundary_candidate(&guard, point)?)
            };
            if let Some(candidate) = candidate {
                best = Self::closer(best, candidate);
            }
            if self.echo_level > 1 {
                log::debug!(
                    "level set: visited {} (box distance {}), best so far {:?}",
                    guard.name(),
                    bound,
                    best.as_ref().map(|b| b.distance)
                );
            }
        }

        let best = best.ok_or_else(|| {
            GeometryError::DegenerateGeometry("level set of an empty multipatch".to_string())
        })?;
        let positive = if has_volume { !inside } else { best.positive };
        let value = if positive { best.distance } else { -best.distance };
        if self.echo_level > 0 {
            log::debug!("level set value at {:?}: {}", point, value);
        }
        Ok(value)
    }

    /// Signed distances of several points
    #[cfg(feature = "parallel")]
    pub fn values(&self, points: &[Point3<T>]) -> GeometryResult<Vec<T>> {
        points.par_iter().map(|p| self.value(p)).collect()
    }

    /// Signed distances of several points
    #[cfg(not(feature = "parallel"))]
    pub fn values(&self, points: &[Point3<T>]) -> GeometryResult<Vec<T>> {
        points.iter().map(|p| self.value(p)).collect()
    }

    fn closer(best: Option<Candidate<T>>, candidate: Candidate<T>) -> Option<Candidate<T>> {
        match best {
            Some(b) if b.distance <= candidate.distance => Some(b),
            _ => Some(candidate),
        }
    }

    /// Closest point on a curve or a surface, signed by the normal
    fn boundary_candidate(
        &self,
        patch: &Patch<T>,
        point: &Point3<T>,
    ) -> GeometryResult<Candidate<T>> {
        let xi = patch.find_closest_parameter(point, &self.options)?;
        let e = patch.evaluate(&xi)?;
        let d = point - e.point;
        let distance = d.norm();
        let normal = normal_of(&e.first)?;
        if normal.norm() <= T::default_epsilon() && distance > self.options.distance_tolerance {
            return Err(GeometryError::DegenerateGeometry(format!(
                "{} has no normal at the closest point {:?}",
                patch.name(),
                xi
            )));
        }
        Ok(Candidate {
            distance,
            positive: normal.dot(&d) >= T::zero(),
        })
    }

    /// Whether the point lies inside a volume, found by mapping it back to the parametric domain
    fn contains(&self, patch: &Patch<T>, point: &Point3<T>) -> GeometryResult<bool> {
        let xi = patch.find_closest_parameter(point, &self.options)?;
        let mapped = patch.point_at(&xi)?;
        Ok((mapped - point).norm() <= self.options.distance_tolerance)
    }

    /// Closest point on the free faces of a volume.
    /// A volume closed on every side by neighbors has none.
    fn face_candidate(
        &self,
        patch: &Patch<T>,
        point: &Point3<T>,
    ) -> GeometryResult<Option<Candidate<T>>> {
        let mut best: Option<Candidate<T>> = None;
        for side in BoundarySide::sides(3).filter(|side| patch.is_free(*side)) {
            let face = patch.boundary_patch(side)?;
            let xi = face.find_closest_parameter(point, &self.options)?;
            let distance = (face.point_at(&xi)? - point).norm();
            best = Self::closer(
                best,
                Candidate {
                    distance,
                    positive: true,
                },
            );
        }
        Ok(best)
    }
}

impl<T: FloatingPoint> fmt::Display for MultiPatchLevelSet<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "MultiPatchLevelSet over {} patches, echo level {}",
            self.multipatch.len(),
            self.echo_level
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::grid::ControlGrid;
    use crate::patch::Patch;
    use crate::space::FunctionSpace;

    fn single(patch: Patch<f64>) -> MultiPatch<f64> {
        let mut multipatch = MultiPatch::new();
        multipatch.add_patch(patch.into_ptr()).unwrap();
        multipatch
    }

    #[test]
    fn curve_is_signed_by_its_rotated_tangent() {
        let line = Patch::try_new(
            1,
            FunctionSpace::primitive(1),
            ControlGrid::linear(&Point3::new(0., 0., 0.), 2, &Point3::new(1., 0., 0.)),
        )
        .unwrap();
        let multipatch = single(line);
        let level_set = MultiPatchLevelSet::new(&multipatch);
        assert_relative_eq!(
            level_set.value(&Point3::new(0.5, 1., 0.)).unwrap(),
            -1.,
            epsilon = 1e-10
        );
        assert_relative_eq!(
            level_set.value(&Point3::new(0.5, -2., 0.)).unwrap(),
            2.,
            epsilon = 1e-10
        );
        // beyond the end the distance is measured to the end point
        assert_relative_eq!(
            level_set.value(&Point3::new(4., -4., 0.)).unwrap(),
            5.,
            epsilon = 1e-10
        );
    }

    #[test]
    fn volume_is_negative_inside() {
        let cube = Patch::try_new(
            1,
            FunctionSpace::cuboid(1, 1, 1),
            ControlGrid::cuboid(&Point3::origin(), &[2, 2, 2], &Point3::new(1., 1., 1.)),
        )
        .unwrap();
        let multipatch = single(cube);
        let level_set = MultiPatchLevelSet::new(&multipatch);
        assert_relative_eq!(
            level_set.value(&Point3::new(0.5, 0.5, 0.5)).unwrap(),
            -0.5,
            epsilon = 1e-8
        );
        assert_relative_eq!(
            level_set.value(&Point3::new(0.5, 0.9, 0.5)).unwrap(),
            -0.1,
            epsilon = 1e-8
        );
        assert_relative_eq!(
            level_set.value(&Point3::new(2., 0.5, 0.5)).unwrap(),
            1.,
            epsilon = 1e-8
        );
    }

    #[test]
    fn batch_matches_single_queries() {
        let square = Patch::try_new(
            1,
            FunctionSpace::rectangular(2, 2),
            ControlGrid::rectangular(0., 0., 3, 3, 1., 1.),
        )
        .unwrap();
        let multipatch = single(square);
        let mut level_set = MultiPatchLevelSet::new(&multipatch);
        level_set.set_echo_level(2);
        let points = vec![
            Point3::new(0.2, 0.3, 1.),
            Point3::new(0.7, 0.1, -0.5),
            Point3::new(2., 0.5, 0.),
        ];
        let values = level_set.values(&points).unwrap();
        for (p, v) in points.iter().zip(values) {
            assert_relative_eq!(level_set.value(p).unwrap(), v);
        }
        assert_relative_eq!(level_set.value(&points[2]).unwrap(), 1., epsilon = 1e-10);
    }

    #[test]
    fn empty_multipatch_has_no_level_set() {
        let multipatch = MultiPatch::<f64>::new();
        let level_set = MultiPatchLevelSet::new(&multipatch);
        assert!(level_set.value(&Point3::origin()).is_err());
    }
}
