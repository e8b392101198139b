//! FCI driver: diagonal, p-space, preconditioner and Davidson wired together

use super::variants::{FciKernel, SpinVariant};
use crate::cistring_impl::{FciSpace, Nelec};
use crate::davidson_impl::{DavidsonOptions, IterationRecord, Preconditioner};
use crate::error::{FciError, Result};
use crate::integrals::Integrals;
use nalgebra::{DMatrix, DVector};
use std::cmp::Ordering;
use tracing::{debug, info};

/// Full-space p-space eigenvalues closer than this are treated as degenerate.
const DEGENERACY_GAP: f64 = 1e-12;

/// P-space eigenvectors whose projection leaves less than this norm are
/// outside the variant's subspace and are not used as guesses.
const MIN_PROJECTED_NORM: f64 = 1e-6;

/// Immutable solver settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    pub conv_tol: f64,
    /// Residual-norm threshold; `sqrt(conv_tol)` when `None`.
    pub residual_tol: Option<f64>,
    pub lindep: f64,
    pub max_cycle: usize,
    pub max_space: usize,
    pub level_shift: f64,
    /// MB
    pub max_memory: f64,
    pub nroots: usize,
    pub pspace_size: usize,
    pub spin: SpinVariant,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            conv_tol: 1e-10,
            residual_tol: None,
            lindep: 1e-14,
            max_cycle: 100,
            max_space: 12,
            level_shift: 1e-3,
            max_memory: 2000.0,
            nroots: 1,
            pspace_size: 400,
            spin: SpinVariant::Auto,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.conv_tol > 0.0) {
            return Err(FciError::InvalidConfiguration(format!(
                "conv_tol must be positive, got {}",
                self.conv_tol
            )));
        }
        if let Some(tol) = self.residual_tol {
            if !(tol > 0.0) {
                return Err(FciError::InvalidConfiguration(format!(
                    "residual_tol must be positive, got {tol}"
                )));
            }
        }
        if self.nroots == 0 || self.max_cycle == 0 || self.max_space == 0 {
            return Err(FciError::InvalidConfiguration(
                "nroots, max_cycle and max_space must be at least 1".to_string(),
            ));
        }
        if !(self.max_memory > 0.0) {
            return Err(FciError::InvalidConfiguration(
                "max_memory must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn residual_tol(&self) -> f64 {
        self.residual_tol.unwrap_or_else(|| self.conv_tol.sqrt())
    }

    pub fn davidson_options(&self) -> DavidsonOptions {
        DavidsonOptions {
            conv_tol: self.conv_tol,
            residual_tol: self.residual_tol,
            lindep: self.lindep,
            max_cycle: self.max_cycle,
            max_space: self.max_space,
            max_memory: self.max_memory,
            nroots: self.nroots,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FciResult {
    /// Electronic energies, ascending
    pub energies: Vec<f64>,
    pub civecs: Vec<DMatrix<f64>>,
    pub converged: bool,
    pub iterations: usize,
    pub variant: SpinVariant,
    pub history: Vec<IterationRecord>,
}

impl FciResult {
    pub fn energy(&self) -> f64 {
        self.energies[0]
    }

    pub fn civec(&self) -> &DMatrix<f64> {
        &self.civecs[0]
    }
}

#[derive(Debug, Clone, Default)]
pub struct FciSolver {
    config: SolverConfig,
}

/// Determinant addresses ordered by diagonal energy, ties by address.
fn lowest_diagonal(hdiag: &DVector<f64>, count: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..hdiag.len()).collect();
    order.sort_by(|&x, &y| {
        hdiag[x]
            .partial_cmp(&hdiag[y])
            .unwrap_or(Ordering::Equal)
            .then(x.cmp(&y))
    });
    order.truncate(count);
    order
}

/// Column `k` of the p-space eigenvectors placed at its determinant addresses.
fn embed_pspace_vector(
    pv: &DMatrix<f64>,
    addresses: &[usize],
    k: usize,
    space: &FciSpace,
) -> DMatrix<f64> {
    let mut flat = DVector::zeros(space.ndet());
    for (i, &addr) in addresses.iter().enumerate() {
        flat[addr] = pv[(i, k)];
    }
    space.unflatten(&flat)
}

/// Lowest p-space eigenvectors that survive the variant's projection,
/// normalised, at most `count` of them.
pub(super) fn pspace_guesses(
    kernel: &dyn FciKernel,
    pv: &DMatrix<f64>,
    addresses: &[usize],
    space: &FciSpace,
    count: usize,
) -> Vec<DVector<f64>> {
    (0..pv.ncols())
        .filter_map(|k| {
            let projected = kernel.project(embed_pspace_vector(pv, addresses, k, space));
            let norm = projected.norm();
            (norm > MIN_PROJECTED_NORM).then(|| space.flatten(&(projected / norm)))
        })
        .take(count)
        .collect()
}

impl FciSolver {
    pub fn new(config: SolverConfig) -> Self {
        FciSolver { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Kernel matching the configured variant; errors when the variant
    /// cannot handle these integrals or electron counts.
    pub fn select_kernel(&self, ints: &Integrals, space: &FciSpace) -> Result<Box<dyn FciKernel>> {
        let kernel = self.config.spin.kernel(ints, space.nelec());
        kernel.check(ints, space)?;
        Ok(kernel)
    }

    /// Lowest `nroots` eigenpairs of the active-space Hamiltonian.
    pub fn kernel(
        &self,
        ints: &Integrals,
        norb: usize,
        nelec: impl Into<Nelec>,
        ci0: Option<&[DMatrix<f64>]>,
    ) -> Result<FciResult> {
        self.config.validate()?;
        ints.check_norb(norb)?;
        let space = FciSpace::new(norb, nelec)?;
        self.kernel_with_space(ints, &space, ci0)
    }

    /// As [`FciSolver::kernel`], reusing prebuilt linkage tables.
    pub fn kernel_with_space(
        &self,
        ints: &Integrals,
        space: &FciSpace,
        ci0: Option<&[DMatrix<f64>]>,
    ) -> Result<FciResult> {
        let config = &self.config;
        config.validate()?;
        ints.check_norb(space.norb())?;
        let kernel = self.select_kernel(ints, space)?;
        let variant = kernel.variant();
        let ndet = space.ndet();
        let nroots = config.nroots.min(ndet);

        info!("===========================================");
        info!("        Direct-CI FCI calculation");
        info!("===========================================");
        info!("Orbitals: {}, electrons: {}", space.norb(), space.nelec());
        info!(
            "Strings: {} alpha x {} beta = {} determinants",
            space.na(),
            space.nb(),
            ndet
        );
        info!(
            "Variant: {}, roots: {}, conv_tol: {:.1e}, residual_tol: {:.1e}",
            variant,
            nroots,
            config.conv_tol,
            config.residual_tol()
        );

        let hdiag = kernel.make_hdiag(ints, space)?;
        let pspace = kernel.pspace(ints, &hdiag, space, config.pspace_size.max(1))?;
        let (pw, pv) = pspace.eigh();
        debug!("Lowest p-space eigenvalue: {:.12}", pw[0]);

        // restart vectors always go through Davidson
        if pspace.len() == ndet && ci0.is_none() {
            let gap_ok = nroots == ndet || (pw[nroots] - pw[nroots - 1]).abs() > DEGENERACY_GAP;
            let civecs: Vec<DMatrix<f64>> = (0..nroots)
                .map(|k| embed_pspace_vector(&pv, &pspace.addresses, k, space))
                .collect();
            let in_subspace = civecs
                .iter()
                .all(|c| (kernel.project(c.clone()) - c).amax() < 1e-8);

            if gap_ok && in_subspace {
                info!("P-space covers the determinant space; exact diagonalisation");
                let energies: Vec<f64> = pw.iter().take(nroots).copied().collect();
                log_energies(&energies);
                return Ok(FciResult {
                    energies,
                    civecs,
                    converged: true,
                    iterations: 0,
                    variant,
                    history: Vec::new(),
                });
            }
            debug!("Degenerate or symmetry-broken p-space solution, refining with Davidson");
        }

        let mut guesses: Vec<DVector<f64>> = match ci0 {
            Some(vectors) => vectors
                .iter()
                .map(|c| -> Result<DVector<f64>> {
                    space.check_civec(c)?;
                    Ok(space.flatten(&kernel.project(c.clone())))
                })
                .collect::<Result<_>>()?,
            None => pspace_guesses(kernel.as_ref(), &pv, &pspace.addresses, space, nroots),
        };
        // fewer guesses than roots: top up with unit vectors
        if guesses.len() < nroots {
            let missing = nroots - guesses.len();
            guesses.extend(lowest_diagonal(&hdiag, missing).into_iter().map(|addr| {
                let mut unit = DVector::zeros(ndet);
                unit[addr] = 1.0;
                space.flatten(&kernel.project(space.unflatten(&unit)))
            }));
        }
        debug!("Davidson starts from {} guess vectors", guesses.len());

        let precond = kernel.make_precond(
            hdiag.clone(),
            pw,
            pv,
            pspace.addresses.clone(),
            config.level_shift,
        );
        let h2e = kernel.absorb_h1e(ints, space.nelec(), 0.5)?;

        let op = |x: &DVector<f64>| -> Result<DVector<f64>> {
            let mut sigma = DMatrix::zeros(space.na(), space.nb());
            kernel.contract_2e_into(
                &h2e,
                &space.unflatten(x),
                space,
                &mut sigma,
                config.max_memory,
            )?;
            Ok(space.flatten(&sigma))
        };
        let projected = |r: &DVector<f64>, e0: f64, x0: &DVector<f64>| {
            let t = precond.precondition(r, e0, x0);
            space.flatten(&kernel.project(space.unflatten(&t)))
        };

        let mut options = config.davidson_options();
        options.nroots = nroots;
        let result = kernel.eig(&op, &guesses, &projected, &options)?;

        let civecs: Vec<DMatrix<f64>> = result.vectors.iter().map(|v| space.unflatten(v)).collect();
        info!(
            "Davidson {} after {} cycles",
            if result.converged { "converged" } else { "stopped" },
            result.iterations
        );
        log_energies(&result.energies);

        Ok(FciResult {
            energies: result.energies,
            civecs,
            converged: result.converged,
            iterations: result.iterations,
            variant,
            history: result.history,
        })
    }
}

fn log_energies(energies: &[f64]) {
    for (k, e) in energies.iter().enumerate() {
        info!("  root {:2}  E = {:.12}", k, e);
    }
}
