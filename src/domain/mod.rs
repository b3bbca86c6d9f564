//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - sweep and configuration types (`SweepSpec`, `ModelConfig`, `GridConfig`)
//! - evaluator outputs (`LossResult`, `LossCurve`, `LossSurface`)
//! - CLI-facing enums for the analysis commands (`LossUnit`, `TimeUnit`, `Channel`, ...)

pub mod types;

pub use types::*;
