//! Command-line interface for lios.

mod commands;
pub mod icons;

pub use commands::{is_verbose, run};
