//! Input/output helpers.
//!
//! - column-file ingest + validation (`ingest`)
//! - three-column exports (`export`)
//! - loss result JSON read/write (`curve`)
//! - TOML run configuration (`config`)

pub mod config;
pub mod curve;
pub mod export;
pub mod ingest;

pub use curve::*;
pub use export::*;
pub use ingest::*;
