//! Measurement-derived inputs to the evaluator.

pub mod dilution;

pub use dilution::ModeDilutionCurve;
