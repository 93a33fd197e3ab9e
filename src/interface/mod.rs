pub mod interface_orientation;
pub mod make_interface;

pub use interface_orientation::*;
pub use make_interface::*;
