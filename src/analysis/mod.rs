//! Measurement post-processing.
//!
//! - coating-loss extraction and φ/Q conversion (`coating`)
//! - temperature-controller logs and time conversion (`timeseries`)

pub mod coating;
pub mod timeseries;

pub use coating::*;
pub use timeseries::*;
