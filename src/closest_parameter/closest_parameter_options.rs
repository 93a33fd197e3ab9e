use crate::misc::{scalar, FloatingPoint};

/// Options for the closest parameter search on a patch
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClosestParameterOptions<T> {
    /// Convergence threshold on the parametric step, relative to the domain size
    pub tolerance: T,
    /// Maximum number of Newton iterations
    pub max_iters: u64,
    /// Maximum number of step halvings within one iteration
    pub max_bisections: usize,
    /// Samples per knot span used to pick the initial guess
    pub samples_per_span: usize,
    /// Points closer than this to a patch are considered on it
    pub distance_tolerance: T,
}

impl<T: FloatingPoint> Default for ClosestParameterOptions<T> {
    fn default() -> Self {
        Self {
            tolerance: scalar(1e-10),
            max_iters: 50,
            max_bisections: 30,
            samples_per_span: 4,
            distance_tolerance: scalar(1e-8),
        }
    }
}
