//! Reporting utilities: run summaries, fit reports and measured-data tables.

pub mod format;

pub use format::*;
