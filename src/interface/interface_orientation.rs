use crate::space::BoundaryDirection;

/// How the parametrization of one boundary side maps onto a matched side.
///
/// The tangential directions of a side are numbered locally in ascending order.
/// Local direction `i` of this side matches local direction `neighbor_local(i)` of the
/// neighbor side and runs along it forward or reversed as given by `direction(i)`.
/// Edges of surfaces use only the first local direction, faces of volumes both,
/// and the point sides of curves none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterfaceOrientation {
    swapped: bool,
    directions: [BoundaryDirection; 2],
}

impl InterfaceOrientation {
    /// Orientation of an edge interface
    pub fn new(direction: BoundaryDirection) -> Self {
        Self {
            swapped: false,
            directions: [direction, BoundaryDirection::Forward],
        }
    }

    pub fn forward() -> Self {
        Self::new(BoundaryDirection::Forward)
    }

    pub fn reversed() -> Self {
        Self::new(BoundaryDirection::Reversed)
    }

    /// Orientation of a face interface.
    /// `swapped` tells whether the first local direction of this face matches
    /// the second one of the neighbor face.
    pub fn face(swapped: bool, first: BoundaryDirection, second: BoundaryDirection) -> Self {
        Self {
            swapped,
            directions: [first, second],
        }
    }

    pub fn is_swapped(&self) -> bool {
        self.swapped
    }

    pub fn direction(&self, local: usize) -> BoundaryDirection {
        self.directions[local]
    }

    /// Local direction of the neighbor side matched with `local`
    pub fn neighbor_local(&self, local: usize) -> usize {
        if self.swapped {
            1 - local
        } else {
            local
        }
    }

    /// Local direction of this side matched with the neighbor's `local`
    pub fn local_of_neighbor(&self, neighbor_local: usize) -> usize {
        self.neighbor_local(neighbor_local)
    }

    /// The same relation seen from the neighbor side
    /// # Example
    /// ```
    /// use isopatch::prelude::*;
    /// let o = InterfaceOrientation::face(
    ///     true,
    ///     BoundaryDirection::Reversed,
    ///     BoundaryDirection::Forward,
    /// );
    /// let inv = o.inverse();
    /// assert_eq!(inv.direction(1), BoundaryDirection::Reversed);
    /// assert_eq!(inv.inverse(), o);
    /// ```
    pub fn inverse(&self) -> Self {
        if self.swapped {
            Self {
                swapped: true,
                directions: [self.directions[1], self.directions[0]],
            }
        } else {
            *self
        }
    }

    /// Flip the traversal of local direction `local`
    pub fn flipped(&self, local: usize) -> Self {
        let mut o = *self;
        o.directions[local] = o.directions[local].flipped();
        o
    }
}

impl From<BoundaryDirection> for InterfaceOrientation {
    fn from(direction: BoundaryDirection) -> Self {
        Self::new(direction)
    }
}
