pub mod closest_parameter_options;
pub mod patch_closest_parameter;
pub mod patch_closest_parameter_newton;
pub mod patch_closest_parameter_problem;
pub use closest_parameter_options::*;
pub use patch_closest_parameter_newton::*;
pub use patch_closest_parameter_problem::*;
