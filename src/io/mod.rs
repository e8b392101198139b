//! Input/Output operations for FCI jobs
//!
//! This module handles logging setup, matrix output and turning job files
//! into integrals.

mod job_loader;
mod output;

pub use job_loader::load_integrals;
pub use output::{setup_output, write_matrix};
