use approx::assert_relative_eq;
use isopatch::prelude::*;
use nalgebra::Point3;

/// Two bicubic unit squares side by side,
/// the right side of the first on the left side of the second
fn two_squares() -> (PatchPtr<f64>, PatchPtr<f64>, MultiPatch<f64>) {
    let left = Patch::try_new(
        1,
        FunctionSpace::rectangular(3, 3),
        ControlGrid::rectangular(0., 0., 4, 4, 1., 1.),
    )
    .unwrap()
    .into_ptr();
    let right = Patch::try_new(
        2,
        FunctionSpace::rectangular(3, 3),
        ControlGrid::rectangular(1., 0., 4, 4, 2., 1.),
    )
    .unwrap()
    .into_ptr();
    make_interface(
        &left,
        BoundarySide::RIGHT,
        &right,
        BoundarySide::LEFT,
        BoundaryDirection::Forward,
    )
    .unwrap();

    let mut multipatch = MultiPatch::new();
    multipatch.add_patch(left.clone()).unwrap();
    multipatch.add_patch(right.clone()).unwrap();
    (left, right, multipatch)
}

#[test]
fn refinement_reaches_the_neighbor() {
    let (left, right, _) = two_squares();
    insert_knots(&left, &[vec![0.5], vec![0.5]]).unwrap();

    let left = left.patch();
    let right = right.patch();
    for direction in 0..2 {
        assert_eq!(
            left.function_space().knots(direction).to_vec(),
            vec![0., 0., 0., 0., 0.5, 1., 1., 1., 1.]
        );
    }
    assert_eq!(left.function_space().numbers(), vec![5, 5]);
    // only the direction running along the interface is carried over
    assert_eq!(right.function_space().numbers(), vec![4, 5]);

    let grid = left.control_grid().unwrap();
    let xs: Vec<f64> = (0..5)
        .map(|i| grid.get(&[i, 0]).unwrap().position().unwrap().x)
        .collect();
    for (x, expected) in xs.iter().zip([0., 1. / 6., 0.5, 5. / 6., 1.]) {
        assert_relative_eq!(*x, expected, epsilon = 1e-14);
    }
}

#[test]
fn enumeration_shares_the_interface() {
    let (left, right, mut multipatch) = two_squares();
    insert_knots(&left, &[vec![0.5], vec![0.5]]).unwrap();
    assert_eq!(multipatch.enumerate().unwrap(), 40);

    let left_ids = multipatch.equation_ids(1).unwrap();
    let right_ids = multipatch.equation_ids(2).unwrap();
    let left_side = left.patch().function_space().boundary_indices(BoundarySide::RIGHT);
    let right_side = right.patch().function_space().boundary_indices(BoundarySide::LEFT);
    assert_eq!(left_side.len(), 5);
    for (a, b) in left_side.iter().zip(right_side.iter()) {
        assert_eq!(left_ids[*a], right_ids[*b]);
    }

    let mut all: Vec<usize> = left_ids.iter().chain(right_ids.iter()).copied().collect();
    all.sort_unstable();
    all.dedup();
    assert_eq!(all, (0..40).collect::<Vec<_>>());
}

#[test]
fn level_set_of_the_assembly() {
    let (left, _, multipatch) = two_squares();
    insert_knots(&left, &[vec![0.5], vec![0.5]]).unwrap();

    let level_set = MultiPatchLevelSet::new(&multipatch);
    assert_relative_eq!(level_set.value(&Point3::new(0.6, 0.6, 1.)).unwrap(), 1., epsilon = 1e-8);
    assert_relative_eq!(level_set.value(&Point3::new(1.6, 0.6, 1.)).unwrap(), 1., epsilon = 1e-8);
    assert_relative_eq!(level_set.value(&Point3::new(1.3, 0.2, 0.)).unwrap(), 0., epsilon = 1e-8);
    assert_relative_eq!(
        level_set.value(&Point3::new(0.4, 0.7, -0.5)).unwrap(),
        -0.5,
        epsilon = 1e-8
    );
    // beyond the outer edge of the second square
    assert_relative_eq!(level_set.value(&Point3::new(5., 0.5, 0.)).unwrap(), 3., epsilon = 1e-8);
}

#[test]
fn mismatched_interface_leaves_both_patches_alone() {
    let coarse = Patch::try_new(
        1,
        FunctionSpace::rectangular(3, 3),
        ControlGrid::rectangular(0., 0., 4, 4, 1., 1.),
    )
    .unwrap()
    .into_ptr();
    let fine = Patch::try_new(
        2,
        FunctionSpace::rectangular(3, 3),
        ControlGrid::rectangular(1., 0., 4, 4, 2., 1.),
    )
    .unwrap()
    .into_ptr();
    insert_knots(&fine, &[vec![], vec![0.25]]).unwrap();

    let result = make_interface(
        &coarse,
        BoundarySide::RIGHT,
        &fine,
        BoundarySide::LEFT,
        BoundaryDirection::Forward,
    );
    assert!(matches!(result, Err(GeometryError::IncompatibleInterface { .. })));
    assert!(coarse.patch().is_free(BoundarySide::RIGHT));
    assert!(fine.patch().is_free(BoundarySide::LEFT));
}
