use std::collections::VecDeque;
use std::sync::Arc;

use nalgebra::DMatrix;

use crate::error::{GeometryError, GeometryResult};
use crate::grid::ControlGrid;
use crate::knot::KnotVector;
use crate::misc::FloatingPoint;
use crate::patch::{PatchAccess, PatchPtr};
use crate::space::FunctionSpace;

/// A refinement request along one parametric direction, as carried across interfaces.
pub(crate) trait DirectionRequest<T: FloatingPoint>: Clone + std::fmt::Debug {
    /// The request asking for nothing
    fn none() -> Self;

    fn is_none(&self) -> bool;

    /// Merge `incoming` into the accumulated request,
    /// returning the part that was not yet requested.
    fn absorb(&mut self, incoming: &Self) -> Option<Self>;

    /// The request as seen from a matched direction running over the domain `(a, b)`,
    /// reflected when the two directions run opposite.
    fn mapped(&self, domain: (T, T), reversed: bool) -> Self;

    /// New knot vector and degree for the direction,
    /// with the matrix mapping old control points to new ones.
    fn refine(
        &self,
        direction: usize,
        degree: usize,
        knots: &KnotVector<T>,
    ) -> GeometryResult<(usize, KnotVector<T>, DMatrix<T>)>;
}

/// Requests accumulated on one patch, one per direction
struct PatchPlan<T: FloatingPoint, R> {
    patch: PatchPtr<T>,
    requests: Vec<R>,
}

/// Refine `origin` with one request per direction and propagate the requests to every
/// patch reachable through interfaces until all matched sides conform again.
///
/// Every affected patch is refined once with the union of the requests it received.
/// All new spaces and grids are computed before any patch is written.
pub(crate) fn refine_with_propagation<T: FloatingPoint, R: DirectionRequest<T>>(
    origin: &PatchPtr<T>,
    requests: Vec<R>,
) -> GeometryResult<usize> {
    let plans = collect_plans(origin, requests)?;

    let mut staged = Vec::with_capacity(plans.len());
    for plan in plans.iter() {
        let guard = plan.patch.patch();
        let mut space = guard.function_space().clone();
        let mut grid = guard.try_control_grid()?.clone();
        for (direction, request) in plan.requests.iter().enumerate() {
            if request.is_none() {
                continue;
            }
            (space, grid) = refine_direction(&space, &grid, direction, request)?;
        }
        log::trace!("refined {} to {:?} control points", guard.name(), space.numbers());
        staged.push((space, grid));
    }

    let affected = plans.len();
    for (plan, (space, grid)) in plans.into_iter().zip(staged) {
        plan.patch.patch_mut().replace_geometry(space, grid);
    }
    Ok(affected)
}

fn refine_direction<T: FloatingPoint, R: DirectionRequest<T>>(
    space: &FunctionSpace<T>,
    grid: &ControlGrid<T>,
    direction: usize,
    request: &R,
) -> GeometryResult<(FunctionSpace<T>, ControlGrid<T>)> {
    let (degree, knots, matrix) =
        request.refine(direction, space.degree(direction), space.knots(direction))?;
    let refined = space.with_direction(direction, degree, knots);
    let grid = grid.transform_along(direction, &matrix);
    if grid.size(direction) != refined.number(direction) {
        return Err(GeometryError::TopologyMismatch {
            expected: refined.numbers(),
            actual: grid.sizes().to_vec(),
        });
    }
    Ok((refined, grid))
}

/// Walk the interface graph from `origin`, accumulating requests until nothing new arrives.
fn collect_plans<T: FloatingPoint, R: DirectionRequest<T>>(
    origin: &PatchPtr<T>,
    requests: Vec<R>,
) -> GeometryResult<Vec<PatchPlan<T, R>>> {
    let dimension = origin.patch().dimension();
    if requests.len() != dimension {
        return Err(GeometryError::InvalidTopology(format!(
            "{} requests given for a {}-dimensional patch",
            requests.len(),
            dimension
        )));
    }

    let mut plans: Vec<PatchPlan<T, R>> = vec![];
    let mut queue: VecDeque<(PatchPtr<T>, usize, R)> = requests
        .into_iter()
        .enumerate()
        .filter(|(_, r)| !r.is_none())
        .map(|(direction, r)| (origin.clone(), direction, r))
        .collect();

    while let Some((patch, direction, request)) = queue.pop_front() {
        let (dimension, domain, entries) = {
            let guard = patch.patch();
            (
                guard.dimension(),
                guard.function_space().domain(direction),
                guard.interfaces().cloned().collect::<Vec<_>>(),
            )
        };

        let position = match plans.iter().position(|p| Arc::ptr_eq(&p.patch, &patch)) {
            Some(position) => position,
            None => {
                plans.push(PatchPlan {
                    patch: patch.clone(),
                    requests: vec![R::none(); dimension],
                });
                plans.len() - 1
            }
        };
        let Some(fresh) = plans[position].requests[direction].absorb(&request) else {
            continue;
        };

        for entry in entries.iter() {
            let tangential = entry.side().tangential_directions(dimension);
            let Some(local) = tangential.iter().position(|d| *d == direction) else {
                continue;
            };
            let Some(neighbor) = entry.neighbor() else {
                log::warn!("skipping a dropped neighbor on side {}", entry.side());
                continue;
            };
            let orientation = entry.orientation();
            let neighbor_direction = entry
                .neighbor_side()
                .tangential_directions(dimension)[orientation.neighbor_local(local)];
            let mapped = fresh.mapped(domain, orientation.direction(local).is_reversed());
            queue.push_back((neighbor, neighbor_direction, mapped));
        }
    }

    Ok(plans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::make_interface;
    use crate::patch::Patch;
    use crate::refinement::knot_insertion::KnotRequest;
    use crate::space::{BoundaryDirection, BoundarySide};

    fn unit(id: usize, x0: f64, y0: f64) -> PatchPtr<f64> {
        Patch::try_new(
            id,
            FunctionSpace::rectangular(1, 1),
            ControlGrid::rectangular(x0, y0, 2, 2, x0 + 1., y0 + 1.),
        )
        .unwrap()
        .into_ptr()
    }

    #[test]
    fn plans_cover_every_reachable_patch_once() {
        // 2 x 2 block of squares: a b on the bottom row, c d on the top row
        let a = unit(1, 0., 0.);
        let b = unit(2, 1., 0.);
        let c = unit(3, 0., 1.);
        let d = unit(4, 1., 1.);
        make_interface(
            &a,
            BoundarySide::RIGHT,
            &b,
            BoundarySide::LEFT,
            BoundaryDirection::Forward,
        )
        .unwrap();
        make_interface(
            &a,
            BoundarySide::TOP,
            &c,
            BoundarySide::BOTTOM,
            BoundaryDirection::Forward,
        )
        .unwrap();
        make_interface(
            &b,
            BoundarySide::TOP,
            &d,
            BoundarySide::BOTTOM,
            BoundaryDirection::Forward,
        )
        .unwrap();
        make_interface(
            &c,
            BoundarySide::RIGHT,
            &d,
            BoundarySide::LEFT,
            BoundaryDirection::Forward,
        )
        .unwrap();

        let plans = collect_plans(
            &a,
            vec![KnotRequest::new(vec![0.5]), KnotRequest::none()],
        )
        .unwrap();
        // u knots travel through the top side only
        assert_eq!(plans.len(), 2);
        assert!(Arc::ptr_eq(&plans[1].patch, &c));

        let plans = collect_plans(
            &a,
            vec![KnotRequest::new(vec![0.5]), KnotRequest::new(vec![0.25])],
        )
        .unwrap();
        // d conforms to both b and c without any refinement
        assert_eq!(plans.len(), 3);
        assert!(plans.iter().all(|p| !Arc::ptr_eq(&p.patch, &d)));
        assert!(plans[0].requests.iter().all(|r| !r.is_none()));
    }

    #[test]
    fn arity_is_checked() {
        let a = unit(1, 0., 0.);
        assert!(collect_plans(&a, vec![KnotRequest::<f64>::none()]).is_err());
    }
}
