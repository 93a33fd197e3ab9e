pub mod frenet_frames;
pub mod half_circle;
pub mod primitives;

pub use frenet_frames::*;
pub use half_circle::*;
pub use primitives::*;
