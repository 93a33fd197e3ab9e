pub mod degree_elevation;
pub mod knot_insertion;
mod propagation;

pub use degree_elevation::{degree_elevate, elevation_matrix};
pub use knot_insertion::insert_knots;
