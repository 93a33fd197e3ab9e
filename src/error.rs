use crate::space::BoundarySide;

/// Errors raised by the geometry kernel.
///
/// Every operation checks its preconditions before mutating anything,
/// so an error always leaves the involved patches as they were.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// Malformed function space parameters.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),
    /// Control grid and function space disagree on their sizes.
    #[error("topology mismatch: expected {expected:?} control points, got {actual:?}")]
    TopologyMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("incompatible interface between {side} of patch {patch} and {neighbor_side} of patch {neighbor}: {reason}")]
    IncompatibleInterface {
        patch: usize,
        side: BoundarySide,
        neighbor: usize,
        neighbor_side: BoundarySide,
        reason: String,
    },
    #[error("side {side} of patch {patch} already has a neighbor")]
    DuplicateInterface { patch: usize, side: BoundarySide },
    #[error("invalid knot value {knot} in direction {direction}: {reason}")]
    InvalidKnotValue {
        direction: usize,
        knot: f64,
        reason: String,
    },
    #[error("invalid degree increment: {0}")]
    InvalidDegreeIncrement(String),
    #[error("patch id {0} is already in use")]
    DuplicateId(usize),
    #[error("patch id {0} not found")]
    NotFound(usize),
    /// Singular geometry, such as a vanishing weight or an undefined normal.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    /// Global DOF query without a current enumeration.
    #[error("the multipatch must be enumerated before querying global indices")]
    StaleEnumeration,
}

pub type GeometryResult<T> = Result<T, GeometryError>;

impl GeometryError {
    /// Recovers a geometric error raised inside a solver,
    /// wrapping anything else as degenerate geometry.
    pub(crate) fn from_solver(error: anyhow::Error) -> Self {
        match error.downcast::<GeometryError>() {
            Ok(e) => e,
            Err(e) => GeometryError::DegenerateGeometry(e.to_string()),
        }
    }
}
