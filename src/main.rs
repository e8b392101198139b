//! FCI Calculation Command-Line Interface
//!
//! Reads an active-space Hamiltonian from a YAML job file and solves for the
//! lowest CI roots.

use color_eyre::eyre::Result;
use rust_fci::app::FciApplication;

fn main() -> Result<()> {
    color_eyre::install()?;
    FciApplication::from_cli()?.run()
}
