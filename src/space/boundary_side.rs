use std::fmt;

/// A topological boundary side of a patch.
///
/// `U0` is the side where the first parametric coordinate takes its minimum,
/// `U1` where it takes its maximum, and likewise for the second and third directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoundarySide {
    U0,
    U1,
    V0,
    V1,
    W0,
    W1,
}

impl BoundarySide {
    pub const LEFT: Self = Self::U0;
    pub const RIGHT: Self = Self::U1;
    pub const BOTTOM: Self = Self::V0;
    pub const TOP: Self = Self::V1;
    pub const BACK: Self = Self::W0;
    pub const FRONT: Self = Self::W1;

    /// The side of `direction` at its minimum (`is_max == false`) or maximum parameter.
    pub fn new(direction: usize, is_max: bool) -> Option<Self> {
        match (direction, is_max) {
            (0, false) => Some(Self::U0),
            (0, true) => Some(Self::U1),
            (1, false) => Some(Self::V0),
            (1, true) => Some(Self::V1),
            (2, false) => Some(Self::W0),
            (2, true) => Some(Self::W1),
            _ => None,
        }
    }

    /// The parametric direction held fixed on this side.
    pub fn direction(&self) -> usize {
        match self {
            Self::U0 | Self::U1 => 0,
            Self::V0 | Self::V1 => 1,
            Self::W0 | Self::W1 => 2,
        }
    }

    pub fn is_max(&self) -> bool {
        matches!(self, Self::U1 | Self::V1 | Self::W1)
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::U0 => Self::U1,
            Self::U1 => Self::U0,
            Self::V0 => Self::V1,
            Self::V1 => Self::V0,
            Self::W0 => Self::W1,
            Self::W1 => Self::W0,
        }
    }

    /// Whether a patch of `dimension` parametric directions has this side.
    pub fn is_valid_for(&self, dimension: usize) -> bool {
        self.direction() < dimension
    }

    /// All sides of a patch with `dimension` parametric directions.
    pub fn sides(dimension: usize) -> impl Iterator<Item = BoundarySide> {
        [
            Self::U0,
            Self::U1,
            Self::V0,
            Self::V1,
            Self::W0,
            Self::W1,
        ]
        .into_iter()
        .filter(move |s| s.is_valid_for(dimension))
    }

    /// Parametric directions running along the side, in ascending order.
    /// # Example
    /// ```
    /// use isopatch::prelude::BoundarySide;
    /// assert_eq!(BoundarySide::U1.tangential_directions(2), vec![1]);
    /// assert_eq!(BoundarySide::V0.tangential_directions(3), vec![0, 2]);
    /// ```
    pub fn tangential_directions(&self, dimension: usize) -> Vec<usize> {
        (0..dimension).filter(|d| *d != self.direction()).collect()
    }
}

impl fmt::Display for BoundarySide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U0 => "U0",
            Self::U1 => "U1",
            Self::V0 => "V0",
            Self::V1 => "V1",
            Self::W0 => "W0",
            Self::W1 => "W1",
        };
        write!(f, "{}", name)
    }
}

/// Relative traversal of two matched parametric directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoundaryDirection {
    #[default]
    Forward,
    Reversed,
}

impl BoundaryDirection {
    pub fn is_reversed(&self) -> bool {
        matches!(self, Self::Reversed)
    }

    pub fn flipped(&self) -> Self {
        match self {
            Self::Forward => Self::Reversed,
            Self::Reversed => Self::Forward,
        }
    }
}
