use std::sync::{Arc, RwLock, Weak};

use crate::interface::InterfaceOrientation;
use crate::misc::FloatingPoint;
use crate::space::BoundarySide;

use super::{Patch, PatchAccess, PatchPtr};

/// Neighbor table entry of a patch: the side it belongs to, the patch and side across it,
/// and how the two parametrizations meet.
///
/// The neighbor is held weakly, so mutual entries never keep each other alive.
#[derive(Clone, Debug)]
pub struct PatchInterface<T: FloatingPoint> {
    side: BoundarySide,
    neighbor: Weak<RwLock<Patch<T>>>,
    neighbor_side: BoundarySide,
    orientation: InterfaceOrientation,
}

impl<T: FloatingPoint> PatchInterface<T> {
    pub(crate) fn new(
        side: BoundarySide,
        neighbor: &PatchPtr<T>,
        neighbor_side: BoundarySide,
        orientation: InterfaceOrientation,
    ) -> Self {
        Self {
            side,
            neighbor: Arc::downgrade(neighbor),
            neighbor_side,
            orientation,
        }
    }

    pub fn side(&self) -> BoundarySide {
        self.side
    }

    /// The neighbor patch, or `None` once it has been dropped
    pub fn neighbor(&self) -> Option<PatchPtr<T>> {
        self.neighbor.upgrade()
    }

    /// Id of the neighbor patch.
    /// Locks the neighbor for reading,
    /// so it must not be called while that patch is locked for writing.
    pub fn neighbor_id(&self) -> Option<usize> {
        self.neighbor().map(|n| n.patch().id())
    }

    pub fn neighbor_side(&self) -> BoundarySide {
        self.neighbor_side
    }

    pub fn orientation(&self) -> InterfaceOrientation {
        self.orientation
    }

    /// Whether the entry points at `patch`
    pub fn is_neighbor(&self, patch: &PatchPtr<T>) -> bool {
        std::ptr::eq(self.neighbor.as_ptr(), Arc::as_ptr(patch))
    }

    pub(crate) fn set_side(&mut self, side: BoundarySide) {
        self.side = side;
    }

    pub(crate) fn set_neighbor_side(&mut self, side: BoundarySide) {
        self.neighbor_side = side;
    }

    pub(crate) fn set_orientation(&mut self, orientation: InterfaceOrientation) {
        self.orientation = orientation;
    }
}
