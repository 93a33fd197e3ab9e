pub mod binomial;
pub mod floating_point;
pub mod reversible;
pub mod transformable;

pub use binomial::*;
pub use floating_point::*;
pub use reversible::*;
pub use transformable::*;
