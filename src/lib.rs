#![allow(clippy::needless_range_loop)]

mod bounding_box;
mod closest_parameter;
mod error;
mod factory;
mod grid;
mod interface;
mod knot;
mod level_set;
mod misc;
mod multipatch;
mod patch;
mod refinement;
mod space;
mod transformation;

pub mod prelude {
    pub use crate::bounding_box::*;
    pub use crate::closest_parameter::*;
    pub use crate::error::*;
    pub use crate::factory::*;
    pub use crate::grid::*;
    pub use crate::interface::*;
    pub use crate::knot::*;
    pub use crate::level_set::*;
    pub use crate::misc::*;
    pub use crate::multipatch::*;
    pub use crate::patch::*;
    pub use crate::refinement::*;
    pub use crate::space::*;
    pub use crate::transformation::*;
}
