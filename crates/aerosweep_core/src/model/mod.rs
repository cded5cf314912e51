//! Core data types shared by the matrix builder and the runner.

mod ids;
mod input;
mod value;

pub use ids::*;
pub use input::*;
pub use value::*;
