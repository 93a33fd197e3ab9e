mod disjoint_set;
pub mod multi_patch;

pub(crate) use disjoint_set::DisjointSet;
pub use multi_patch::*;
