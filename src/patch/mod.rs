pub mod patch;
pub mod patch_interface;
pub mod utility;
pub use patch::*;
pub use patch_interface::*;
pub use utility::*;
