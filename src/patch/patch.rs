use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use nalgebra::{Point3, Vector3, Vector4};

use crate::bounding_box::BoundingBox;
use crate::error::{GeometryError, GeometryResult};
use crate::grid::ControlGrid;
use crate::misc::{FloatingPoint, Transformable};
use crate::space::{BoundarySide, FunctionSpace, MAX_DIMENSION};
use crate::transformation::Transformation;

use super::PatchInterface;

/// Shared handle to a patch.
/// The same patch can be reached from a multipatch and from local handles;
/// one writer at a time, any number of readers.
pub type PatchPtr<T> = Arc<RwLock<Patch<T>>>;

/// Lock access to a shared patch.
/// A poisoned lock still hands out the patch since every mutation is applied atomically.
pub trait PatchAccess<T: FloatingPoint> {
    fn patch(&self) -> RwLockReadGuard<'_, Patch<T>>;
    fn patch_mut(&self) -> RwLockWriteGuard<'_, Patch<T>>;
}

impl<T: FloatingPoint> PatchAccess<T> for PatchPtr<T> {
    fn patch(&self) -> RwLockReadGuard<'_, Patch<T>> {
        self.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn patch_mut(&self) -> RwLockWriteGuard<'_, Patch<T>> {
        self.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Position and parametric derivatives of a patch at a parametric point.
#[derive(Clone, Debug)]
pub struct PatchDerivatives<T: FloatingPoint> {
    pub point: Point3<T>,
    /// `first[i]` is the derivative along direction `i`
    pub first: Vec<Vector3<T>>,
    /// `second[i][j]` is the mixed derivative along directions `i` and `j`
    pub second: Vec<Vec<Vector3<T>>>,
}

/// A parametric patch: one function space and the control grid bound to it.
///
/// A curve, surface or volume depending on the dimension of its function space.
/// The id is assigned by the caller and has to be unique within a multipatch.
#[derive(Debug)]
pub struct Patch<T: FloatingPoint> {
    id: usize,
    prefix: String,
    space: FunctionSpace<T>,
    grid: Option<ControlGrid<T>>,
    interfaces: BTreeMap<BoundarySide, PatchInterface<T>>,
    revision: u64,
}

impl<T: FloatingPoint> Patch<T> {
    /// Create a patch without a control grid
    pub fn new(id: usize, space: FunctionSpace<T>) -> Self {
        Self {
            id,
            prefix: "Patch".to_string(),
            space,
            grid: None,
            interfaces: BTreeMap::new(),
            revision: 0,
        }
    }

    /// Create a patch and bind its control grid
    /// # Example
    /// ```
    /// use isopatch::prelude::*;
    /// use nalgebra::Point3;
    ///
    /// let space = FunctionSpace::<f64>::rectangular(1, 1);
    /// let grid = ControlGrid::rectangular(0., 0., 2, 2, 2., 1.);
    /// let patch = Patch::try_new(1, space, grid).unwrap();
    /// assert_eq!(patch.name(), "Patch_1");
    /// let p = patch.point_at(&[0.5, 0.5]).unwrap();
    /// assert!((p - Point3::new(1., 0.5, 0.)).norm() < 1e-12);
    /// ```
    pub fn try_new(
        id: usize,
        space: FunctionSpace<T>,
        grid: ControlGrid<T>,
    ) -> GeometryResult<Self> {
        let mut patch = Self::new(id, space);
        patch.set_control_grid(grid)?;
        Ok(patch)
    }

    /// Wrap the patch into a shared handle
    pub fn into_ptr(self) -> PatchPtr<T> {
        Arc::new(RwLock::new(self))
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Same patch under another id.
    /// Shared patches are re-keyed through
    /// [`MultiPatch::set_patch_id`](crate::multipatch::MultiPatch::set_patch_id).
    pub fn with_id(mut self, id: usize) -> Self {
        self.set_id(id);
        self
    }

    pub(crate) fn set_id(&mut self, id: usize) {
        self.id = id;
        self.touch();
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    pub fn name(&self) -> String {
        format!("{}_{}", self.prefix, self.id)
    }

    pub fn dimension(&self) -> usize {
        self.space.dimension()
    }

    /// Polynomial degree in `direction`
    pub fn degree(&self, direction: usize) -> usize {
        self.space.degree(direction)
    }

    pub fn function_space(&self) -> &FunctionSpace<T> {
        &self.space
    }

    pub fn control_grid(&self) -> Option<&ControlGrid<T>> {
        self.grid.as_ref()
    }

    /// Counter bumped by every topological change of the patch
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn touch(&mut self) {
        self.revision += 1;
    }

    /// The bound control grid, failing when none is bound yet.
    pub fn try_control_grid(&self) -> GeometryResult<&ControlGrid<T>> {
        self.grid.as_ref().ok_or_else(|| GeometryError::TopologyMismatch {
            expected: self.space.numbers(),
            actual: vec![],
        })
    }

    /// Bind a control grid, whose extents must equal the control point counts of the space.
    pub fn set_control_grid(&mut self, grid: ControlGrid<T>) -> GeometryResult<()> {
        let expected = self.space.numbers();
        if grid.sizes() != expected.as_slice() {
            return Err(GeometryError::TopologyMismatch {
                expected,
                actual: grid.sizes().to_vec(),
            });
        }
        self.grid = Some(grid);
        self.touch();
        Ok(())
    }

    /// Replace space and grid together, as refinement does.
    pub(crate) fn replace_geometry(&mut self, space: FunctionSpace<T>, grid: ControlGrid<T>) {
        self.space = space;
        self.grid = Some(grid);
        self.touch();
    }

    /// Transform every control point, leaving the patch untouched on failure.
    pub fn apply_transformation(
        &mut self,
        transformation: &Transformation<T>,
    ) -> GeometryResult<()> {
        match self.grid.as_mut() {
            Some(grid) => grid.try_transform(transformation),
            None => Err(GeometryError::TopologyMismatch {
                expected: self.space.numbers(),
                actual: vec![],
            }),
        }
    }

    /// Evaluate the position and its first and second parametric derivatives.
    ///
    /// Sums the homogeneous control points against the basis, then divides by the
    /// interpolated weight with the quotient rule.
    pub fn evaluate(&self, xi: &[T]) -> GeometryResult<PatchDerivatives<T>> {
        let grid = self.try_control_grid()?;
        let dimension = self.dimension();
        let basis = self.space.evaluate_basis(xi)?;

        let mut a = Vector4::zeros();
        let mut a1 = [Vector4::zeros(); MAX_DIMENSION];
        let mut a2 = [[Vector4::zeros(); MAX_DIMENSION]; MAX_DIMENSION];
        for b in basis.iter() {
            let h = grid.points()[b.index()].homogeneous();
            a += h * b.value();
            for i in 0..dimension {
                a1[i] += h * b.derivative(i);
                for j in 0..dimension {
                    a2[i][j] += h * b.second_derivative(i, j);
                }
            }
        }

        let w = a.w;
        if w.abs() <= T::default_epsilon() {
            return Err(GeometryError::DegenerateGeometry(format!(
                "vanishing weight on {}",
                self.name()
            )));
        }

        let point = a.xyz() / w;
        let first: Vec<Vector3<T>> = (0..dimension)
            .map(|i| (a1[i].xyz() - point * a1[i].w) / w)
            .collect();
        let second = (0..dimension)
            .map(|i| {
                (0..dimension)
                    .map(|j| {
                        (a2[i][j].xyz()
                            - point * a2[i][j].w
                            - first[j] * a1[i].w
                            - first[i] * a1[j].w)
                            / w
                    })
                    .collect()
            })
            .collect();

        Ok(PatchDerivatives {
            point: Point3::from(point),
            first,
            second,
        })
    }

    /// Position at a parametric point
    pub fn point_at(&self, xi: &[T]) -> GeometryResult<Point3<T>> {
        self.evaluate(xi).map(|e| e.point)
    }

    /// Tangent vectors, one per parametric direction
    pub fn derivatives_at(&self, xi: &[T]) -> GeometryResult<Vec<Vector3<T>>> {
        self.evaluate(xi).map(|e| e.first)
    }

    /// Unnormalized normal: the cross product of the tangents for surfaces,
    /// the tangent rotated clockwise about z for curves.
    pub fn normal_at(&self, xi: &[T]) -> GeometryResult<Vector3<T>> {
        let tangents = self.derivatives_at(xi)?;
        normal_of(&tangents)
    }

    /// Box around the control points, which contains the patch
    pub fn bounding_box(&self) -> GeometryResult<BoundingBox<T>> {
        let positions = self.try_control_grid()?.positions()?;
        BoundingBox::new_with_points(positions).ok_or_else(|| {
            GeometryError::DegenerateGeometry(format!("{} has no control points", self.name()))
        })
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &PatchInterface<T>> {
        self.interfaces.values()
    }

    pub fn interface(&self, side: BoundarySide) -> Option<&PatchInterface<T>> {
        self.interfaces.get(&side)
    }

    /// Whether the side has no neighbor
    pub fn is_free(&self, side: BoundarySide) -> bool {
        !self.interfaces.contains_key(&side)
    }

    pub(crate) fn insert_interface(&mut self, interface: PatchInterface<T>) {
        self.interfaces.insert(interface.side(), interface);
        self.touch();
    }

    pub(crate) fn remove_interface(&mut self, side: BoundarySide) -> Option<PatchInterface<T>> {
        let removed = self.interfaces.remove(&side);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    pub(crate) fn interfaces_mut(&mut self) -> &mut BTreeMap<BoundarySide, PatchInterface<T>> {
        &mut self.interfaces
    }

    pub(crate) fn space_and_grid_mut(
        &mut self,
    ) -> (&mut FunctionSpace<T>, Option<&mut ControlGrid<T>>) {
        (&mut self.space, self.grid.as_mut())
    }

    /// The patch of one dimension less lying on a side, without neighbors.
    pub fn boundary_patch(&self, side: BoundarySide) -> GeometryResult<Patch<T>> {
        let space = self.space.boundary_space(side)?;
        let grid = self.try_control_grid()?.boundary(side)?;
        let mut patch = Patch::try_new(self.id, space, grid)?;
        patch.set_prefix(format!("{}_{}", self.name(), side));
        Ok(patch)
    }

    /// Check the grid binding and the neighbor table.
    /// Every neighbor must still exist and list this patch back on the matching side.
    /// Locks the neighbors for reading.
    pub fn validate(&self) -> GeometryResult<()> {
        let grid = self.try_control_grid()?;
        if grid.sizes() != self.space.numbers().as_slice() {
            return Err(GeometryError::TopologyMismatch {
                expected: self.space.numbers(),
                actual: grid.sizes().to_vec(),
            });
        }

        for interface in self.interfaces.values() {
            let incompatible = |neighbor: usize, reason: &str| {
                GeometryError::IncompatibleInterface {
                    patch: self.id,
                    side: interface.side(),
                    neighbor,
                    neighbor_side: interface.neighbor_side(),
                    reason: reason.to_string(),
                }
            };
            let neighbor = interface
                .neighbor()
                .ok_or_else(|| incompatible(self.id, "the neighbor patch was dropped"))?;
            // a patch matched with itself is already locked by the caller
            let Ok(guard) = neighbor.try_read() else {
                continue;
            };
            let back = guard
                .interface(interface.neighbor_side())
                .filter(|back| back.side() == interface.neighbor_side())
                .ok_or_else(|| incompatible(guard.id(), "the neighbor has no entry back"))?;
            if back.neighbor_side() != interface.side() {
                return Err(incompatible(guard.id(), "the neighbor entry names another side"));
            }
        }
        Ok(())
    }

}

/// Normal from the tangents of a curve or a surface
pub(crate) fn normal_of<T: FloatingPoint>(tangents: &[Vector3<T>]) -> GeometryResult<Vector3<T>> {
    match tangents {
        [t] => Ok(Vector3::new(t.y, -t.x, T::zero())),
        [u, v] => Ok(u.cross(v)),
        _ => Err(GeometryError::InvalidTopology(format!(
            "a normal is defined for curves and surfaces, not for {} directions",
            tangents.len()
        ))),
    }
}

impl<T: FloatingPoint> fmt::Display for Patch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} (dimension {})", self.name(), self.dimension())?;
        write!(f, "{}", self.space)?;
        match &self.grid {
            Some(grid) => write!(f, "{}", grid)?,
            None => writeln!(f, "ControlGrid: none")?,
        }
        for interface in self.interfaces.values() {
            writeln!(
                f,
                "  neighbor on {}: {} of patch {:?} ({:?})",
                interface.side(),
                interface.neighbor_side(),
                interface
                    .neighbor()
                    .and_then(|n| n.try_read().ok().map(|p| p.id())),
                interface.orientation()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    use super::*;
    use crate::grid::ControlPoint;

    /// quarter of the unit circle as a rational quadratic
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
        Patch::try_new(7, FunctionSpace::primitive(2), grid).unwrap()
    }

    #[test]
    fn grid_must_match_space() {
        let mut patch = Patch::new(1, FunctionSpace::<f64>::rectangular(3, 3));
        let grid = ControlGrid::rectangular(0., 0., 4, 3, 1., 1.);
        assert!(matches!(
            patch.set_control_grid(grid),
            Err(GeometryError::TopologyMismatch { .. })
        ));
        assert!(patch.control_grid().is_none());
        assert!(patch.point_at(&[0.5, 0.5]).is_err());
        let grid = ControlGrid::rectangular(0., 0., 4, 4, 1., 1.);
        patch.set_control_grid(grid).unwrap();
        assert_eq!(patch.degree(0), 3);
    }

    #[test]
    fn rational_curve_is_exact_circle() {
        let patch = quarter_circle();
        for i in 0..=10 {
            let u = i as f64 / 10.;
            let e = patch.evaluate(&[u]).unwrap();
            assert_relative_eq!(e.point.coords.norm(), 1.0, epsilon = 1e-12);
            // tangent is orthogonal to the radius
            assert_relative_eq!(e.first[0].dot(&e.point.coords), 0.0, epsilon = 1e-12);
        }
        // outward normal for a counter clockwise arc
        let n = patch.normal_at(&[0.5]).unwrap();
        let p = patch.point_at(&[0.5]).unwrap();
        assert!(n.dot(&p.coords) > 0.);
    }

    #[test]
    fn second_derivatives_match_finite_differences() {
        let patch = quarter_circle();
        let h = 1e-5;
        let u = 0.3;
        let e = patch.evaluate(&[u]).unwrap();
        let d0 = patch.derivatives_at(&[u - h]).unwrap()[0];
        let d1 = patch.derivatives_at(&[u + h]).unwrap()[0];
        let fd = (d1 - d0) / (2. * h);
        assert_relative_eq!(e.second[0][0], fd, epsilon = 1e-6);
    }

    #[test]
    fn surface_normal_and_bounding_box() {
        let grid = ControlGrid::rectangular(0., 0., 3, 2, 2., 1.);
        let space = FunctionSpace::try_tensor(&[
            FunctionSpace::primitive(2),
            FunctionSpace::primitive(1),
        ])
        .unwrap();
        let mut patch = Patch::try_new(1, space, grid).unwrap();
        let n = patch.normal_at(&[0.2, 0.9]).unwrap();
        assert_relative_eq!(n.normalize(), Vector3::z(), epsilon = 1e-12);

        patch
            .apply_transformation(&Transformation::translation(0., 0., 3.))
            .unwrap();
        let b = patch.bounding_box().unwrap();
        assert_relative_eq!(*b.min(), Vector3::new(0., 0., 3.));
        assert_relative_eq!(*b.max(), Vector3::new(2., 1., 3.));
    }

    #[test]
    fn boundary_patch_of_surface() {
        let grid = ControlGrid::rectangular(0., 0., 2, 2, 2., 1.);
        let patch = Patch::try_new(3, FunctionSpace::rectangular(1, 1), grid).unwrap();
        let top = patch.boundary_patch(BoundarySide::TOP).unwrap();
        assert_eq!(top.dimension(), 1);
        assert_eq!(top.name(), "Patch_3_V1_3");
        assert_relative_eq!(top.point_at(&[0.5]).unwrap(), Point3::new(1., 1., 0.));
        assert!(top.boundary_patch(BoundarySide::U0).is_err());
        assert!(patch.validate().is_ok());
    }
}
