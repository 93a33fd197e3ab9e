use argmin::core::{ArgminFloat, Executor, State};
use itertools::Itertools;
use nalgebra::{DVector, Point3};

use crate::error::{GeometryError, GeometryResult};
use crate::misc::{count, FloatingPoint};
use crate::patch::Patch;

use super::{ClosestParameterOptions, PatchClosestParameterNewton, PatchClosestParameterProblem};

impl<T: FloatingPoint + ArgminFloat> Patch<T> {
    /// Find the parameter of the point on the patch closest to `point`.
    ///
    /// A regular sampling of every knot span gives the initial guess,
    /// which is refined by a damped Newton iteration kept within the domain.
    ///
    /// # Example
    /// ```
    /// use isopatch::prelude::*;
    /// use nalgebra::Point3;
    ///
    /// let patch = Patch::try_new(
    ///     1,
    ///     FunctionSpace::rectangular(1, 1),
    ///     ControlGrid::rectangular(0., 0., 2, 2, 2., 1.),
    /// ).unwrap();
    /// let xi = patch
    ///     .find_closest_parameter(
    ///         &Point3::new(1.5, 0.25, 3.),
    ///         &ClosestParameterOptions::default(),
    ///     )
    ///     .unwrap();
    /// assert!((xi[0] - 0.75).abs() < 1e-8);
    /// assert!((xi[1] - 0.25).abs() < 1e-8);
    /// ```
    pub fn find_closest_parameter(
        &self,
        point: &Point3<T>,
        options: &ClosestParameterOptions<T>,
    ) -> GeometryResult<Vec<T>> {
        let space = self.function_space();
        let domain = (0..self.dimension()).map(|d| space.domain(d)).collect();
        let x0 = self.initial_guess(point, options.samples_per_span)?;

        let solver =
            PatchClosestParameterNewton::new(domain, options.tolerance, options.max_bisections);
        let res = Executor::new(PatchClosestParameterProblem::new(point, self), solver)
            .configure(|state| state.param(x0).max_iters(options.max_iters))
            .run()
            .map_err(GeometryError::from_solver)?;
        log::trace!(
            "closest parameter on {} after {} iterations",
            self.name(),
            res.state().get_iter()
        );
        res.state()
            .get_best_param()
            .map(|param| param.iter().copied().collect())
            .ok_or_else(|| {
                GeometryError::DegenerateGeometry(format!(
                    "no closest parameter found on {}",
                    self.name()
                ))
            })
    }

    /// Sampled parameter nearest to `point`
    fn initial_guess(
        &self,
        point: &Point3<T>,
        samples_per_span: usize,
    ) -> GeometryResult<DVector<T>> {
        let space = self.function_space();
        let n = samples_per_span.max(1);
        let samples: Vec<Vec<T>> = (0..self.dimension())
            .map(|d| {
                let knots = space.knots(d).multiplicity();
                let mut values: Vec<T> = knots
                    .windows(2)
                    .flat_map(|w| {
                        let (a, b) = (w[0].knot(), w[1].knot());
                        (0..n).map(move |i| a + (b - a) * count::<T>(i) / count::<T>(n))
                    })
                    .collect();
                values.push(space.domain(d).1);
                values
            })
            .collect();

        let mut best: Option<(T, Vec<T>)> = None;
        for xi in samples.into_iter().multi_cartesian_product() {
            let distance = (self.point_at(&xi)? - point).norm_squared();
            if best.as_ref().map_or(true, |(d, _)| distance < *d) {
                best = Some((distance, xi));
            }
        }
        best.map(|(_, xi)| DVector::from_vec(xi)).ok_or_else(|| {
            GeometryError::DegenerateGeometry(format!("{} has an empty domain", self.name()))
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::factory::{small_ring, Axis};
    use crate::grid::{ControlGrid, ControlPoint};
    use crate::space::FunctionSpace;

    fn quarter_circle() -> Patch<f64> {
        let w = std::f64::consts::FRAC_1_SQRT_2;
        let grid = ControlGrid::try_new(
            vec![3],
            vec![
                ControlPoint::new(1., 0., 0., 1.),
                ControlPoint::new(1., 1., 0., w),
                ControlPoint::new(0., 1., 0., 1.),
            ],
        )
        .unwrap();
        Patch::try_new(1, FunctionSpace::primitive(2), grid).unwrap()
    }

    #[test]
    fn projects_onto_an_arc() {
        let arc = quarter_circle();
        let options = ClosestParameterOptions::default();
        let angle = 0.3_f64;
        let target = Point3::new(2. * angle.cos(), 2. * angle.sin(), 0.);
        let xi = arc.find_closest_parameter(&target, &options).unwrap();
        let p = arc.point_at(&xi).unwrap();
        assert_relative_eq!(p, Point3::new(angle.cos(), angle.sin(), 0.), epsilon = 1e-8);
    }

    #[test]
    fn clamps_to_the_domain() {
        let arc = quarter_circle();
        let options = ClosestParameterOptions::default();
        let xi = arc
            .find_closest_parameter(&Point3::new(2., -1., 0.), &options)
            .unwrap();
        assert_relative_eq!(xi[0], 0.);
    }

    /// Smallest distance over a dense grid of parameters
    fn sampled_distance(patch: &Patch<f64>, target: &Point3<f64>) -> f64 {
        let n = 200;
        (0..=n)
            .cartesian_product(0..=n)
            .map(|(i, j)| {
                let xi = [i as f64 / n as f64, j as f64 / n as f64];
                (patch.point_at(&xi).unwrap() - target).norm()
            })
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn edge_minima_on_a_ring() {
        let ring = small_ring(&Point3::origin(), Axis::Z, 1., 2., 0., 90.).unwrap();
        let options = ClosestParameterOptions::default();
        let targets = [
            Point3::new(0.3, 0.2, 0.),
            Point3::new(0.5, 0.1, 0.7),
            Point3::new(2.5, 1., 0.),
            Point3::new(-0.5, 1.5, 0.),
            Point3::new(1.2, -0.4, 0.3),
        ];
        for target in targets.iter() {
            let xi = ring.find_closest_parameter(target, &options).unwrap();
            let distance = (ring.point_at(&xi).unwrap() - target).norm();
            let sampled = sampled_distance(&ring, target);
            assert!(distance <= sampled + 1e-10, "{:?}: {} > {}", target, distance, sampled);
            assert!(sampled - distance < 1e-3, "{:?}: {} < {}", target, distance, sampled);
        }

        // inside the inner radius the nearest point is on the inner arc
        let target = Point3::new(0.3, 0.2, 0.);
        let xi = ring.find_closest_parameter(&target, &options).unwrap();
        assert_relative_eq!(xi[1], 0.);
        assert_relative_eq!(
            (ring.point_at(&xi).unwrap() - target).norm(),
            1. - 0.13_f64.sqrt(),
            epsilon = 1e-8
        );
    }

    #[test]
    fn projects_into_a_volume() {
        let space = FunctionSpace::cuboid(1, 1, 1);
        let grid = ControlGrid::cuboid(
            &Point3::new(0., 0., 0.),
            &[2, 2, 2],
            &Point3::new(1., 2., 4.),
        );
        let cube = Patch::try_new(1, space, grid).unwrap();
        let options = ClosestParameterOptions::default();
        let xi = cube
            .find_closest_parameter(&Point3::new(0.5, 1., 1.), &options)
            .unwrap();
        assert_relative_eq!(xi[0], 0.5, epsilon = 1e-8);
        assert_relative_eq!(xi[1], 0.5, epsilon = 1e-8);
        assert_relative_eq!(xi[2], 0.25, epsilon = 1e-8);
    }
}
