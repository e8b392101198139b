//! Command-line argument parsing for FCI jobs

use clap::Parser;

/// Direct-CI FCI solver driven by a YAML job file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML job file
    #[arg(short, long, default_value = "job.yaml")]
    pub config_file: String,

    /// Override energy convergence threshold
    #[arg(long)]
    pub conv_tol: Option<f64>,

    /// Override residual norm threshold
    #[arg(long)]
    pub residual_tol: Option<f64>,

    /// Override maximum Davidson cycles
    #[arg(long)]
    pub max_cycle: Option<usize>,

    /// Override maximum Davidson subspace size
    #[arg(long)]
    pub max_space: Option<usize>,

    /// Override number of roots
    #[arg(long)]
    pub nroots: Option<usize>,

    /// Override p-space size
    #[arg(long)]
    pub pspace_size: Option<usize>,

    /// Override preconditioner level shift
    #[arg(long)]
    pub level_shift: Option<f64>,

    /// Solver variant (auto, ms0, spin0, spin1, uhf)
    #[arg(long)]
    pub spin: Option<String>,

    /// Compute 1- and 2-particle density matrices
    #[arg(long)]
    pub rdm: bool,

    /// Override output file: (default stdout)
    #[arg(short, long)]
    pub output: Option<String>,
}
