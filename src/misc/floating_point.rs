use nalgebra::{convert, RealField};
use num_traits::ToPrimitive;

/// Trait for floating point types (f32, f64)
/// Mainly used to identify the type of the field in nalgebra
pub trait FloatingPoint: RealField + ToPrimitive + Copy {}

impl FloatingPoint for f32 {}
impl FloatingPoint for f64 {}

/// Converts an `f64` constant into the working scalar type.
pub fn scalar<T: FloatingPoint>(value: f64) -> T {
    convert(value)
}

/// Converts a count or an index into the working scalar type.
pub fn count<T: FloatingPoint>(value: usize) -> T {
    convert(value as f64)
}

/// Tolerance used to compare knot values and parametric coordinates.
pub fn knot_tolerance<T: FloatingPoint>() -> T {
    scalar(1e-12)
}
