use std::sync::Arc;

use crate::error::{GeometryError, GeometryResult};
use crate::grid::ControlGrid;
use crate::knot::KnotVector;
use crate::misc::{FloatingPoint, Reversible};

use super::{Patch, PatchAccess, PatchInterface, PatchPtr};

/// Stack sections of equal function spaces into a patch of one more dimension.
///
/// The new last direction gets an open uniform knot vector of `degree`
/// with one control point per section, so the result interpolates the first and last sections.
///
/// # Example
/// ```
/// use isopatch::prelude::*;
/// use nalgebra::Point3;
///
/// let bottom = Patch::try_new(
///     1,
///     FunctionSpace::primitive(1),
///     ControlGrid::linear(&Point3::new(0., 0., 0.), 2, &Point3::new(2., 0., 0.)),
/// ).unwrap();
/// let top = Patch::try_new(
///     2,
///     FunctionSpace::primitive(1),
///     ControlGrid::linear(&Point3::new(0., 1., 0.), 2, &Point3::new(2., 1., 0.)),
/// ).unwrap();
/// let rectangle = loft(&[&bottom, &top], 1).unwrap();
/// assert_eq!(rectangle.dimension(), 2);
/// assert_eq!(rectangle.point_at(&[1., 1.]).unwrap(), Point3::new(2., 1., 0.));
/// ```
pub fn loft<T: FloatingPoint>(sections: &[&Patch<T>], degree: usize) -> GeometryResult<Patch<T>> {
    let first = sections
        .first()
        .ok_or_else(|| GeometryError::InvalidTopology("no sections to loft".to_string()))?;
    if let Some(other) = sections
        .iter()
        .find(|s| !s.function_space().approx_eq(first.function_space()))
    {
        return Err(GeometryError::TopologyMismatch {
            expected: first.function_space().numbers(),
            actual: other.function_space().numbers(),
        });
    }
    if sections.len() < degree + 1 {
        return Err(GeometryError::InvalidTopology(format!(
            "lofting {} sections cannot carry degree {}",
            sections.len(),
            degree
        )));
    }

    let space = first
        .function_space()
        .try_extruded(degree, KnotVector::open_uniform(sections.len(), degree))?;
    let grids = sections
        .iter()
        .map(|s| s.try_control_grid().cloned())
        .collect::<GeometryResult<Vec<_>>>()?;
    let grid = ControlGrid::try_stacked(&grids)?;
    Patch::try_new(0, space, grid)
}

/// Reverse the parametrization of a patch along `direction`.
///
/// The sides normal to `direction` trade places, and every interface running along it
/// has its traversal flag flipped on both entries, so matched control points stay matched.
/// Neighbors keep their own parametrization, see [`reverse_connected`] to carry the reversal over.
pub fn reverse<T: FloatingPoint>(patch: &PatchPtr<T>, direction: usize) -> GeometryResult<()> {
    let (dimension, entries) = {
        let guard = patch.patch();
        (guard.dimension(), guard.interfaces().cloned().collect::<Vec<_>>())
    };
    if direction >= dimension {
        return Err(GeometryError::InvalidTopology(format!(
            "direction {} of a {}-dimensional patch",
            direction, dimension
        )));
    }

    let own = entries
        .iter()
        .map(|entry| {
            let mut e = entry.clone();
            reverse_own_side(&mut e, direction, dimension);
            if e.is_neighbor(patch) {
                reverse_neighbor_side(&mut e, direction, dimension);
            }
            (e.side(), e)
        })
        .collect();

    let mut neighbors: Vec<PatchPtr<T>> = vec![];
    for neighbor in entries.iter().filter_map(|e| e.neighbor()) {
        if Arc::ptr_eq(&neighbor, patch) || neighbors.iter().any(|n| Arc::ptr_eq(n, &neighbor)) {
            continue;
        }
        neighbors.push(neighbor);
    }
    for neighbor in neighbors.iter() {
        let mut guard = neighbor.patch_mut();
        guard
            .interfaces_mut()
            .values_mut()
            .filter(|e| e.is_neighbor(patch))
            .for_each(|e| reverse_neighbor_side(e, direction, dimension));
        guard.touch();
    }

    let mut guard = patch.patch_mut();
    {
        let (space, grid) = guard.space_and_grid_mut();
        space.reverse(direction);
        if let Some(grid) = grid {
            grid.reverse(direction);
        }
    }
    *guard.interfaces_mut() = own;
    guard.touch();
    Ok(())
}

/// Reverse a patch along `direction` together with every patch reached through
/// interfaces running along it, each along its matching direction.
///
/// Interfaces between two reversed patches keep their orientation; the others are
/// updated as by [`reverse`]. A patch is reversed at most once. Curves do not carry the
/// reversal over since their interfaces are points. Returns the number of patches reversed.
pub fn reverse_connected<T: FloatingPoint>(
    patch: &PatchPtr<T>,
    direction: usize,
) -> GeometryResult<usize> {
    let dimension = patch.patch().dimension();
    if direction >= dimension {
        return Err(GeometryError::InvalidTopology(format!(
            "direction {} of a {}-dimensional patch",
            direction, dimension
        )));
    }

    let mut reversals: Vec<(PatchPtr<T>, usize)> = vec![(patch.clone(), direction)];
    let mut next = 0;
    while next < reversals.len() {
        let (current, direction) = reversals[next].clone();
        next += 1;
        let entries = current.patch().interfaces().cloned().collect::<Vec<_>>();
        for entry in entries.iter() {
            let tangential = entry.side().tangential_directions(dimension);
            let Some(local) = tangential.iter().position(|d| *d == direction) else {
                continue;
            };
            let Some(neighbor) = entry.neighbor() else {
                continue;
            };
            if reversals.iter().any(|(p, _)| Arc::ptr_eq(p, &neighbor)) {
                continue;
            }
            let neighbor_local = entry.orientation().neighbor_local(local);
            let neighbor_directions = entry.neighbor_side().tangential_directions(dimension);
            reversals.push((neighbor, neighbor_directions[neighbor_local]));
        }
    }

    for (p, d) in reversals.iter() {
        log::debug!("reversing {} along direction {}", p.patch().name(), d);
        reverse(p, *d)?;
    }
    Ok(reversals.len())
}

/// Update an entry of the reversed patch itself.
fn reverse_own_side<T: FloatingPoint>(
    e: &mut PatchInterface<T>,
    direction: usize,
    dimension: usize,
) {
    let tangential = e.side().tangential_directions(dimension);
    if let Some(local) = tangential.iter().position(|d| *d == direction) {
        e.set_orientation(e.orientation().flipped(local));
    }
    if e.side().direction() == direction {
        e.set_side(e.side().opposite());
    }
}

/// Update an entry whose neighbor is the reversed patch.
fn reverse_neighbor_side<T: FloatingPoint>(
    e: &mut PatchInterface<T>,
    direction: usize,
    dimension: usize,
) {
    let tangential = e.neighbor_side().tangential_directions(dimension);
    if let Some(neighbor_local) = tangential.iter().position(|d| *d == direction) {
        let local = e.orientation().local_of_neighbor(neighbor_local);
        e.set_orientation(e.orientation().flipped(local));
    }
    if e.neighbor_side().direction() == direction {
        e.set_neighbor_side(e.neighbor_side().opposite());
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    use super::*;
    use crate::interface::{interface_index_pairs, make_interface};
    use crate::space::{BoundaryDirection, BoundarySide, FunctionSpace};

    fn graded_square(id: usize, x0: f64) -> PatchPtr<f64> {
        let space = FunctionSpace::try_tensor(&[
            FunctionSpace::primitive(1),
            FunctionSpace::try_new(
                vec![1],
                vec![KnotVector::new(vec![0., 0., 0.25, 1., 1.])],
            )
            .unwrap(),
        ])
        .unwrap();
        let grid = ControlGrid::rectangular(x0, 0., 2, 3, x0 + 1., 1.);
        Patch::try_new(id, space, grid).unwrap().into_ptr()
    }

    fn assert_matched_points_coincide(a: &PatchPtr<f64>, side: BoundarySide) {
        let a = a.patch();
        let entry = a.interface(side).unwrap();
        let b = entry.neighbor().unwrap();
        let b = b.patch();
        let pairs = interface_index_pairs(
            a.function_space(),
            side,
            b.function_space(),
            entry.neighbor_side(),
            &entry.orientation(),
        )
        .unwrap();
        let pa = a.control_grid().unwrap().positions().unwrap();
        let pb = b.control_grid().unwrap().positions().unwrap();
        for (i, j) in pairs {
            assert_relative_eq!(pa[i], pb[j]);
        }
    }

    #[test]
    fn loft_rejects_mismatched_sections() {
        let a = Patch::try_new(
            1,
            FunctionSpace::primitive(1),
            ControlGrid::linear(&Point3::origin(), 2, &Point3::new(1., 0., 0.)),
        )
        .unwrap();
        let b = Patch::try_new(
            2,
            FunctionSpace::primitive(2),
            ControlGrid::linear(&Point3::new(0., 1., 0.), 3, &Point3::new(1., 1., 0.)),
        )
        .unwrap();
        assert!(loft(&[&a, &b], 1).is_err());
        assert!(loft(&[&a, &a], 2).is_err());
        assert!(loft::<f64>(&[], 1).is_err());
        assert_eq!(loft(&[&a, &a, &a], 2).unwrap().function_space().numbers(), vec![2, 3]);
    }

    #[test]
    fn reversing_along_an_interface_flips_its_orientation() {
        let left = graded_square(1, 0.);
        let right = graded_square(2, 1.);
        make_interface(
            &left,
            BoundarySide::RIGHT,
            &right,
            BoundarySide::LEFT,
            BoundaryDirection::Forward,
        )
        .unwrap();

        reverse(&right, 1).unwrap();
        assert_eq!(
            right.patch().function_space().knots(1).to_vec(),
            vec![0., 0., 0.75, 1., 1.]
        );
        for (patch, side) in [(&left, BoundarySide::RIGHT), (&right, BoundarySide::LEFT)] {
            let entry = patch.patch().interface(side).cloned().unwrap();
            assert_eq!(entry.orientation().direction(0), BoundaryDirection::Reversed);
        }
        left.patch().validate().unwrap();
        assert_matched_points_coincide(&left, BoundarySide::RIGHT);
    }

    #[test]
    fn reversing_across_an_interface_moves_its_side() {
        let left = graded_square(1, 0.);
        let right = graded_square(2, 1.);
        make_interface(
            &left,
            BoundarySide::RIGHT,
            &right,
            BoundarySide::LEFT,
            BoundaryDirection::Forward,
        )
        .unwrap();

        reverse(&right, 0).unwrap();
        assert!(right.patch().is_free(BoundarySide::LEFT));
        assert!(!right.patch().is_free(BoundarySide::RIGHT));
        let entry = left.patch().interface(BoundarySide::RIGHT).cloned().unwrap();
        assert_eq!(entry.neighbor_side(), BoundarySide::RIGHT);
        assert_eq!(entry.orientation().direction(0), BoundaryDirection::Forward);
        right.patch().validate().unwrap();
        assert_matched_points_coincide(&right, BoundarySide::RIGHT);
        assert!(reverse(&right, 2).is_err());
    }

    #[test]
    fn connected_reversal_reaches_the_neighbors() {
        // a | b with c on top of b
        let a = graded_square(1, 0.);
        let b = graded_square(2, 1.);
        let c = Patch::try_new(
            3,
            FunctionSpace::rectangular(1, 1),
            ControlGrid::rectangular(1., 1., 2, 2, 2., 2.),
        )
        .unwrap()
        .into_ptr();
        make_interface(&a, BoundarySide::RIGHT, &b, BoundarySide::LEFT, BoundaryDirection::Forward)
            .unwrap();
        make_interface(&b, BoundarySide::TOP, &c, BoundarySide::BOTTOM, BoundaryDirection::Forward)
            .unwrap();

        assert_eq!(reverse_connected(&b, 1).unwrap(), 2);
        for patch in [&a, &b] {
            assert_eq!(
                patch.patch().function_space().knots(1).to_vec(),
                vec![0., 0., 0.75, 1., 1.]
            );
        }
        let entry = a.patch().interface(BoundarySide::RIGHT).cloned().unwrap();
        assert_eq!(entry.orientation().direction(0), BoundaryDirection::Forward);
        assert_matched_points_coincide(&a, BoundarySide::RIGHT);

        // c sits across the reversed direction and only sees the side of b move
        assert_eq!(c.patch().point_at(&[0., 0.]).unwrap(), Point3::new(1., 1., 0.));
        let entry = c.patch().interface(BoundarySide::BOTTOM).cloned().unwrap();
        assert_eq!(entry.neighbor_side(), BoundarySide::BOTTOM);
        assert_matched_points_coincide(&c, BoundarySide::BOTTOM);
        for patch in [&a, &b, &c] {
            patch.patch().validate().unwrap();
        }
    }
}
