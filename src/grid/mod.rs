pub mod control_grid;
pub mod control_point;
pub use control_grid::*;
pub use control_point::*;
