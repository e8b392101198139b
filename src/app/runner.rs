use crate::config::{Args, Config};
use crate::solver_impl::{SolverConfig, SpinVariant};
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;

/// Job-file solver parameters with command-line overrides applied.
pub fn resolve_solver_config(args: &Args, config: &Config) -> Result<SolverConfig> {
    let params = config.solver.clone().unwrap_or_default().with_defaults();
    let mut solver = params.to_solver_config();

    if let Some(conv_tol) = args.conv_tol {
        info!("Overriding conv_tol with: {:.1e}", conv_tol);
        solver.conv_tol = conv_tol;
    }
    if let Some(residual_tol) = args.residual_tol {
        info!("Overriding residual_tol with: {:.1e}", residual_tol);
        solver.residual_tol = Some(residual_tol);
    }
    if let Some(max_cycle) = args.max_cycle {
        info!("Overriding max_cycle with: {}", max_cycle);
        solver.max_cycle = max_cycle;
    }
    if let Some(max_space) = args.max_space {
        info!("Overriding max_space with: {}", max_space);
        solver.max_space = max_space;
    }
    if let Some(nroots) = args.nroots {
        info!("Overriding nroots with: {}", nroots);
        solver.nroots = nroots;
    }
    if let Some(pspace_size) = args.pspace_size {
        info!("Overriding pspace_size with: {}", pspace_size);
        solver.pspace_size = pspace_size;
    }
    if let Some(level_shift) = args.level_shift {
        info!("Overriding level_shift with: {}", level_shift);
        solver.level_shift = level_shift;
    }
    if let Some(spin) = &args.spin {
        solver.spin = spin
            .parse::<SpinVariant>()
            .wrap_err_with(|| format!("Invalid --spin value: {spin}"))?;
        info!("Overriding solver variant with: {}", solver.spin);
    }

    solver.validate().wrap_err("Invalid solver parameters")?;
    Ok(solver)
}

pub fn wants_rdm(args: &Args, config: &Config) -> bool {
    args.rdm || config.rdm.unwrap_or(false)
}
