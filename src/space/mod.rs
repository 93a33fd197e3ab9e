pub mod basis_function_value;
pub mod boundary_side;
pub mod function_space;
pub use basis_function_value::*;
pub use boundary_side::*;
pub use function_space::*;
