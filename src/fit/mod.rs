//! Fitting of measured loss.
//!
//! - bulk/shear decomposition with a parallel exponent grid search (`decompose`)
//! - parametric bootstrap of the decomposition (`bootstrap`)

pub mod bootstrap;
pub mod decompose;

pub use bootstrap::*;
pub use decompose::*;
