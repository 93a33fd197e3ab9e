pub mod transformation;
pub use transformation::*;
