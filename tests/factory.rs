use approx::assert_relative_eq;
use isopatch::prelude::*;
use nalgebra::Point3;

fn assert_interfaces_share_ids(multipatch: &MultiPatch<f64>) {
    for patch in multipatch.iter() {
        let patch = patch.patch();
        let ids = multipatch.equation_ids(patch.id()).unwrap();
        for interface in patch.interfaces() {
            let neighbor = interface.neighbor().unwrap();
            let neighbor = neighbor.patch();
            let neighbor_ids = multipatch.equation_ids(neighbor.id()).unwrap();
            let pairs = interface_index_pairs(
                patch.function_space(),
                interface.side(),
                neighbor.function_space(),
                interface.neighbor_side(),
                &interface.orientation(),
            )
            .unwrap();
            for (a, b) in pairs {
                assert_eq!(ids[a], neighbor_ids[b]);
            }
        }
    }
}

fn sample(patch: &Patch<f64>) -> Vec<Point3<f64>> {
    let n = 6;
    (0..=n)
        .flat_map(|i| (0..=n).map(move |j| [i as f64 / n as f64, j as f64 / n as f64]))
        .map(|xi| patch.point_at(&xi).unwrap())
        .collect()
}

#[test]
fn lofted_rectangle_hits_its_corners() {
    let corners = [
        Point3::new(0., 0., 0.),
        Point3::new(3., 0., 0.),
        Point3::new(3., 2., 0.),
        Point3::new(0., 2., 0.),
    ];
    let bottom = line(&corners[0], &corners[1], 1).unwrap();
    let top = line(&corners[3], &corners[2], 1).unwrap();
    let rectangle = loft(&[&bottom, &top], 1).unwrap();
    assert_eq!(rectangle.point_at(&[0., 0.]).unwrap(), corners[0]);
    assert_eq!(rectangle.point_at(&[1., 0.]).unwrap(), corners[1]);
    assert_eq!(rectangle.point_at(&[1., 1.]).unwrap(), corners[2]);
    assert_eq!(rectangle.point_at(&[0., 1.]).unwrap(), corners[3]);
}

#[test]
fn half_circle_refines_consistently() {
    let patches = half_circle4(
        &Point3::new(0., 0., 0.),
        Axis::Z,
        1.,
        0.,
        &HalfCircleOptions::default(),
    )
    .unwrap();
    let before: Vec<Vec<Point3<f64>>> = patches.iter().map(|p| sample(&p.patch())).collect();

    // along the arc of the first patch: reaches the inner square and the third patch
    let refined = insert_knots(&patches[0], &[vec![0.5], vec![]]).unwrap();
    assert_eq!(refined, 3);
    assert_eq!(patches[3].patch().function_space().numbers(), vec![3, 4]);
    assert_eq!(patches[2].patch().function_space().numbers(), vec![4, 2]);
    assert_eq!(patches[1].patch().function_space().numbers(), vec![3, 2]);

    // radially: every patch but the square
    degree_elevate(&patches[1], &[0, 1]).unwrap();
    for patch in patches.iter().take(3) {
        assert_eq!(patch.patch().degree(1), 2);
    }

    for (patch, points) in patches.iter().zip(before) {
        for (p, q) in sample(&patch.patch()).iter().zip(points) {
            assert_relative_eq!(*p, q, epsilon = 1e-12);
        }
    }

    let mut multipatch = MultiPatch::new();
    for patch in patches {
        multipatch.add_patch(patch).unwrap();
    }
    multipatch.validate().unwrap();
    multipatch.enumerate().unwrap();
    assert_interfaces_share_ids(&multipatch);
}

#[test]
fn stacked_slabs_share_a_face() {
    let lower = slab(&Point3::new(0., 0., 0.), &Point3::new(1., 1., 1.)).unwrap();
    let upper = slab(&Point3::new(0., 0., 1.), &Point3::new(1., 1., 2.))
        .unwrap()
        .with_id(1);
    let lower = lower.into_ptr();
    let upper = upper.into_ptr();
    make_interface(
        &lower,
        BoundarySide::FRONT,
        &upper,
        BoundarySide::BACK,
        InterfaceOrientation::face(false, BoundaryDirection::Forward, BoundaryDirection::Forward),
    )
    .unwrap();
    insert_knots(&upper, &[vec![0.5], vec![], vec![0.5]]).unwrap();
    assert_eq!(lower.patch().function_space().numbers(), vec![3, 2, 2]);

    let mut multipatch = MultiPatch::new();
    multipatch.add_patch(lower).unwrap();
    multipatch.add_patch(upper).unwrap();
    assert_eq!(multipatch.enumerate().unwrap(), 12 + 18 - 6);
    assert_interfaces_share_ids(&multipatch);

    let level_set = MultiPatchLevelSet::new(&multipatch);
    // the shared face is interior
    assert_relative_eq!(level_set.value(&Point3::new(0.5, 0.5, 1.)).unwrap(), -0.5, epsilon = 1e-8);
    assert_relative_eq!(level_set.value(&Point3::new(0.5, 0.5, 3.)).unwrap(), 1., epsilon = 1e-8);
}

#[test]
fn half_circle_distances_reach_the_rim() {
    let patches = half_circle4(
        &Point3::origin(),
        Axis::Z,
        1.,
        0.,
        &HalfCircleOptions::default(),
    )
    .unwrap();
    let mut multipatch = MultiPatch::new();
    for patch in patches {
        multipatch.add_patch(patch).unwrap();
    }
    let level_set = MultiPatchLevelSet::new(&multipatch);

    let rim = |p: Point3<f64>| {
        let planar = (p.x * p.x + p.y * p.y).sqrt() - 1.;
        (planar * planar + p.z * p.z).sqrt()
    };
    let outside = [
        Point3::new(0.3, 1.5, 0.),
        Point3::new(0.6, 1., 0.4),
        Point3::new(1.2, 0.9, 0.),
        Point3::new(-1.1, 0.3, -0.2),
        Point3::new(-0.2, 2., 0.),
    ];
    for p in outside {
        let value: f64 = level_set.value(&p).unwrap();
        assert_relative_eq!(value.abs(), rim(p), epsilon = 1e-7);
    }

    // below the diameter and above the interior
    let value = level_set.value(&Point3::new(0.2, -0.5, 0.)).unwrap();
    assert_relative_eq!(value, 0.5, epsilon = 1e-7);
    let value = level_set.value(&Point3::new(0.1, 0.2, 0.5)).unwrap();
    assert_relative_eq!(value.abs(), 0.5, epsilon = 1e-7);
}
