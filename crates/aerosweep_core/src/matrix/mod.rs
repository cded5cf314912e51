//! Case-matrix expansion.
//!
//! A sweep is described declaratively as a set of [`ParameterSpec`]s. Specs that
//! share a group vary in lock-step (the i-th case of the group takes the i-th
//! value of every spec in it); groups combine by Cartesian product.
//!
//! ```ignore
//! use aerosweep_core::matrix::{ParameterSpec, SpecSet};
//!
//! let mut specs = SpecSet::new();
//! specs.push(ParameterSpec::new("ElastoDyn", "PtfmSgDOF", vec!["False".into()], 0)?)?;
//! specs.push(ParameterSpec::new("InflowWind", "HWindSpeed", vec![8.into(), 12.into()], 1)?)?;
//! specs.push(ParameterSpec::new("DISCON_in", "TCIPC_ControlMode", vec![0.into(), 1.into()], 2)?)?;
//!
//! // 1 x 2 x 2 = 4 cases, last group varies fastest
//! let matrix = specs.build()?;
//! assert_eq!(matrix.len(), 4);
//! ```

mod builder;
mod grid;
mod spec;

pub use builder::*;
pub use grid::*;
pub use spec::*;
