use std::sync::Arc;

use nalgebra::Point3;

use crate::error::{GeometryError, GeometryResult};
use crate::misc::{knot_tolerance, scalar, FloatingPoint};
use crate::patch::{Patch, PatchAccess, PatchInterface, PatchPtr};
use crate::space::{BoundarySide, FunctionSpace};

use super::InterfaceOrientation;

/// Declare `side_a` of patch `a` and `side_b` of patch `b` as one conforming boundary.
///
/// Along every matched pair of directions the two sides must share degree,
/// control point count and knot vector (reflected when the pair runs reversed).
/// Records the entry on both patches; the geometry is not touched,
/// the coincidence of the two boundaries is up to the caller.
///
/// # Example
/// ```
/// use isopatch::prelude::*;
///
/// let left = Patch::try_new(
///     1,
///     FunctionSpace::rectangular(1, 1),
///     ControlGrid::rectangular(0., 0., 2, 2, 1., 1.),
/// ).unwrap().into_ptr();
/// let right = Patch::try_new(
///     2,
///     FunctionSpace::rectangular(1, 1),
///     ControlGrid::rectangular(1., 0., 2, 2, 2., 1.),
/// ).unwrap().into_ptr();
///
/// make_interface(
///     &left,
///     BoundarySide::RIGHT,
///     &right,
///     BoundarySide::LEFT,
///     BoundaryDirection::Forward,
/// )
/// .unwrap();
/// assert!(!left.patch().is_free(BoundarySide::RIGHT));
/// assert_eq!(right.patch().interface(BoundarySide::LEFT).unwrap().neighbor_id(), Some(1));
/// ```
pub fn make_interface<T: FloatingPoint>(
    a: &PatchPtr<T>,
    side_a: BoundarySide,
    b: &PatchPtr<T>,
    side_b: BoundarySide,
    orientation: impl Into<InterfaceOrientation>,
) -> GeometryResult<()> {
    let orientation = orientation.into();
    let same = Arc::ptr_eq(a, b);

    {
        let guard_a = a.patch();
        let guard_b = if same { None } else { Some(b.patch()) };
        let patch_b = guard_b.as_deref().unwrap_or(&*guard_a);

        let incompatible = |reason: String| GeometryError::IncompatibleInterface {
            patch: guard_a.id(),
            side: side_a,
            neighbor: patch_b.id(),
            neighbor_side: side_b,
            reason,
        };

        if same && side_a == side_b {
            return Err(incompatible("a side cannot be matched with itself".to_string()));
        }
        if guard_a.dimension() != patch_b.dimension() {
            return Err(incompatible(format!(
                "dimensions {} and {} differ",
                guard_a.dimension(),
                patch_b.dimension()
            )));
        }
        if !side_a.is_valid_for(guard_a.dimension()) || !side_b.is_valid_for(patch_b.dimension()) {
            return Err(incompatible("no such side".to_string()));
        }
        if !guard_a.is_free(side_a) {
            return Err(GeometryError::DuplicateInterface {
                patch: guard_a.id(),
                side: side_a,
            });
        }
        if !patch_b.is_free(side_b) {
            return Err(GeometryError::DuplicateInterface {
                patch: patch_b.id(),
                side: side_b,
            });
        }

        check_compatibility(
            guard_a.function_space(),
            side_a,
            patch_b.function_space(),
            side_b,
            &orientation,
        )
        .map_err(incompatible)?;
        if guard_a.dimension() == 1 {
            check_shared_point(&guard_a, side_a, patch_b, side_b).map_err(incompatible)?;
        }
    }

    let entry_a = PatchInterface::new(side_a, b, side_b, orientation);
    let entry_b = PatchInterface::new(side_b, a, side_a, orientation.inverse());
    if same {
        let mut guard = a.patch_mut();
        guard.insert_interface(entry_a);
        guard.insert_interface(entry_b);
    } else {
        a.patch_mut().insert_interface(entry_a);
        b.patch_mut().insert_interface(entry_b);
    }

    log::debug!(
        "interface {} of patch {:p} <-> {} of patch {:p} ({:?})",
        side_a,
        Arc::as_ptr(a),
        side_b,
        Arc::as_ptr(b),
        orientation
    );
    Ok(())
}

/// Remove the interface on `side` from the patch and from its neighbor.
/// Returns whether there was one.
pub fn remove_interface<T: FloatingPoint>(patch: &PatchPtr<T>, side: BoundarySide) -> bool {
    let Some(entry) = patch.patch_mut().remove_interface(side) else {
        return false;
    };
    if let Some(neighbor) = entry.neighbor() {
        let mut guard = neighbor.patch_mut();
        let points_back = guard
            .interface(entry.neighbor_side())
            .is_some_and(|back| back.is_neighbor(patch) && back.neighbor_side() == side);
        if points_back {
            guard.remove_interface(entry.neighbor_side());
        }
    }
    true
}

/// The end points joined by a curve interface must coincide.
/// Patches without a control grid yet are not checked.
fn check_shared_point<T: FloatingPoint>(
    a: &Patch<T>,
    side_a: BoundarySide,
    b: &Patch<T>,
    side_b: BoundarySide,
) -> Result<(), String> {
    let end = |patch: &Patch<T>, side: BoundarySide| -> Result<Option<Point3<T>>, String> {
        let Some(grid) = patch.control_grid() else {
            return Ok(None);
        };
        let index = patch.function_space().boundary_indices(side);
        grid.points()[index[0]]
            .position()
            .map(Some)
            .map_err(|e| e.to_string())
    };
    let (Some(pa), Some(pb)) = (end(a, side_a)?, end(b, side_b)?) else {
        return Ok(());
    };
    let scale = T::one() + pa.coords.norm().max(pb.coords.norm());
    if (pa - pb).norm() > scalar::<T>(1e-10) * scale {
        return Err(format!("end points {:?} and {:?} do not coincide", pa, pb));
    }
    Ok(())
}

/// Check that two boundary sides carry the same basis along every matched direction.
fn check_compatibility<T: FloatingPoint>(
    space_a: &FunctionSpace<T>,
    side_a: BoundarySide,
    space_b: &FunctionSpace<T>,
    side_b: BoundarySide,
    orientation: &InterfaceOrientation,
) -> Result<(), String> {
    let dimension = space_a.dimension();
    let tangential_a = side_a.tangential_directions(dimension);
    let tangential_b = side_b.tangential_directions(dimension);
    let tol = knot_tolerance::<T>();

    for (local, da) in tangential_a.iter().enumerate() {
        let db = tangential_b[orientation.neighbor_local(local)];
        if space_a.degree(*da) != space_b.degree(db) {
            return Err(format!(
                "degrees {} and {} differ along the side",
                space_a.degree(*da),
                space_b.degree(db)
            ));
        }
        if space_a.number(*da) != space_b.number(db) {
            return Err(format!(
                "control point counts {} and {} differ along the side",
                space_a.number(*da),
                space_b.number(db)
            ));
        }
        let knots_b = if orientation.direction(local).is_reversed() {
            space_b.knots(db).reversed()
        } else {
            space_b.knots(db).clone()
        };
        if !space_a.knots(*da).approx_eq(&knots_b, tol) {
            return Err(format!(
                "knot vectors {} and {} differ along the side",
                space_a.knots(*da),
                knots_b
            ));
        }
    }
    Ok(())
}

/// Pairs of local control point indices that coincide across an interface.
///
/// The pairs follow the ordering of `side_a`; the spaces must be compatible along the sides.
/// # Example
/// ```
/// use isopatch::prelude::*;
/// let space = FunctionSpace::<f64>::rectangular(2, 1);
/// let pairs = interface_index_pairs(
///     &space,
///     BoundarySide::TOP,
///     &space,
///     BoundarySide::BOTTOM,
///     &InterfaceOrientation::reversed(),
/// ).unwrap();
/// assert_eq!(pairs, vec![(3, 2), (4, 1), (5, 0)]);
/// ```
pub fn interface_index_pairs<T: FloatingPoint>(
    space_a: &FunctionSpace<T>,
    side_a: BoundarySide,
    space_b: &FunctionSpace<T>,
    side_b: BoundarySide,
    orientation: &InterfaceOrientation,
) -> GeometryResult<Vec<(usize, usize)>> {
    let dimension = space_a.dimension();
    let mismatch = || GeometryError::TopologyMismatch {
        expected: space_a.numbers(),
        actual: space_b.numbers(),
    };
    if space_b.dimension() != dimension
        || !side_a.is_valid_for(dimension)
        || !side_b.is_valid_for(dimension)
    {
        return Err(mismatch());
    }

    let tangential_a = side_a.tangential_directions(dimension);
    let tangential_b = side_b.tangential_directions(dimension);
    for (local, da) in tangential_a.iter().enumerate() {
        let db = tangential_b[orientation.neighbor_local(local)];
        if space_a.number(*da) != space_b.number(db) {
            return Err(mismatch());
        }
    }

    let fixed_b = if side_b.is_max() {
        space_b.number(side_b.direction()) - 1
    } else {
        0
    };
    let indices_a = space_a.boundary_indices(side_a);
    let pairs = indices_a
        .into_iter()
        .enumerate()
        .map(|(k, ia)| {
            let mut rest = k;
            let mut index_b = vec![0; dimension];
            index_b[side_b.direction()] = fixed_b;
            for (local, da) in tangential_a.iter().enumerate() {
                let n = space_a.number(*da);
                let l = rest % n;
                rest /= n;
                let db = tangential_b[orientation.neighbor_local(local)];
                index_b[db] = if orientation.direction(local).is_reversed() {
                    n - 1 - l
                } else {
                    l
                };
            }
            (ia, space_b.linear_index(&index_b))
        })
        .collect();
    Ok(pairs)
}
