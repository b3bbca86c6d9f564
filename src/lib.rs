//! `ted-loss` library crate.
//!
//! Thermoelastic loss of coated disk resonators (interface, substrate and
//! coating contributions) plus the small analysis tools used around it.
//!
//! The binary (`ted`) is a thin wrapper around this library so that:
//!
//! - the physics and fits are testable without spawning processes
//! - modules are reusable from notebooks or other front-ends
//! - code stays easy to navigate as the project grows

pub mod analysis;
pub mod app;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod materials;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod sweep;
pub mod tui;
