pub mod multi_patch_level_set;

pub use multi_patch_level_set::*;
