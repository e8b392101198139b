mod report;
mod runner;

pub use runner::{resolve_solver_config, wants_rdm};

use self::report::{report_density_matrices, report_summary};
use crate::cistring_impl::FciSpace;
use crate::config::{Args, Config};
use crate::io::{load_integrals, setup_output};
use crate::solver_impl::FciSolver;
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use std::fs;
use tracing::info;

pub struct FciApplication {
    args: Args,
    config: Config,
}

impl FciApplication {
    pub fn from_cli() -> Result<Self> {
        let args = Args::parse();
        let config = load_config(&args)?;
        Ok(Self { args, config })
    }

    pub fn run(self) -> Result<()> {
        setup_output(self.args.output.as_ref());
        info!("Job read from: {}", self.args.config_file);

        let solver_config = resolve_solver_config(&self.args, &self.config)?;
        let integrals = load_integrals(&self.config)?;
        let space = FciSpace::new(self.config.norb, self.config.nelec)
            .wrap_err("Invalid active space")?;
        let ecore = self.config.ecore.unwrap_or(0.0);

        let solver = FciSolver::new(solver_config);
        let result = solver
            .kernel_with_space(&integrals, &space, None)
            .wrap_err("FCI solver failed")?;
        report_summary(&result, ecore);

        if wants_rdm(&self.args, &self.config) {
            report_density_matrices(&result, &integrals, &space, ecore)?;
        }
        Ok(())
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let config_content = fs::read_to_string(&args.config_file)
        .wrap_err_with(|| format!("Unable to read job file: {}", args.config_file))?;

    serde_yml::from_str::<Config>(&config_content).wrap_err("Failed to parse job file")
}
