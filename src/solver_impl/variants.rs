//! Solver variants: which symmetry and integral layout a calculation uses

use crate::cistring_impl::{FciSpace, Nelec};
use crate::contract_impl::{self, AbsorbedHamiltonian, DEFAULT_MAX_MEMORY};
use crate::davidson_impl::{self, DavidsonOptions, DavidsonResult, Preconditioner};
use crate::error::{FciError, Result};
use crate::hdiag_impl::{self, PSpace, PSpacePreconditioner};
use crate::integrals::Integrals;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Matrix-vector product handed to the eigensolver.
pub type LinearOperator<'a> = dyn Fn(&DVector<f64>) -> Result<DVector<f64>> + 'a;

/// The operations a direct-CI solver is built from. Every variant shares the
/// generic kernels; they differ in what they accept and in how they treat
/// alpha/beta exchange symmetry.
pub trait FciKernel: Send + Sync {
    fn variant(&self) -> SpinVariant;

    /// Reject integrals or electron counts this variant cannot handle.
    fn check(&self, ints: &Integrals, space: &FciSpace) -> Result<()>;

    fn absorb_h1e(&self, ints: &Integrals, nelec: Nelec, fac: f64) -> Result<AbsorbedHamiltonian> {
        contract_impl::absorb_h1e(ints, nelec, fac)
    }

    fn contract_1e(
        &self,
        f1e: &DMatrix<f64>,
        civec: &DMatrix<f64>,
        space: &FciSpace,
    ) -> Result<DMatrix<f64>> {
        contract_impl::contract_1e(f1e, civec, space)
    }

    fn contract_2e(
        &self,
        h2e: &AbsorbedHamiltonian,
        civec: &DMatrix<f64>,
        space: &FciSpace,
    ) -> Result<DMatrix<f64>> {
        let mut sigma = DMatrix::zeros(space.na(), space.nb());
        self.contract_2e_into(h2e, civec, space, &mut sigma, DEFAULT_MAX_MEMORY)?;
        Ok(sigma)
    }

    /// Writes `H|c>` into `out`, keeping intermediates under `max_memory` MB.
    fn contract_2e_into(
        &self,
        h2e: &AbsorbedHamiltonian,
        civec: &DMatrix<f64>,
        space: &FciSpace,
        out: &mut DMatrix<f64>,
        max_memory: f64,
    ) -> Result<()> {
        contract_impl::contract_2e_into(h2e, civec, space, out, max_memory)
    }

    fn make_hdiag(&self, ints: &Integrals, space: &FciSpace) -> Result<DVector<f64>> {
        hdiag_impl::make_hdiag(ints, space)
    }

    fn pspace(
        &self,
        ints: &Integrals,
        hdiag: &DVector<f64>,
        space: &FciSpace,
        np: usize,
    ) -> Result<PSpace> {
        hdiag_impl::pspace(ints, hdiag, space, np)
    }

    fn make_precond(
        &self,
        hdiag: DVector<f64>,
        eigenvalues: DVector<f64>,
        eigenvectors: DMatrix<f64>,
        addresses: Vec<usize>,
        level_shift: f64,
    ) -> PSpacePreconditioner {
        PSpacePreconditioner::new(hdiag, eigenvalues, eigenvectors, addresses, level_shift)
    }

    fn eig(
        &self,
        op: &LinearOperator<'_>,
        guesses: &[DVector<f64>],
        precond: &dyn Preconditioner,
        options: &DavidsonOptions,
    ) -> Result<DavidsonResult> {
        davidson_impl::davidson(op, guesses, precond, options)
    }

    /// Project a CI matrix onto the subspace this variant works in.
    fn project(&self, civec: DMatrix<f64>) -> DMatrix<f64> {
        civec
    }
}

fn require_restricted(ints: &Integrals, variant: SpinVariant) -> Result<()> {
    if !ints.is_restricted() {
        return Err(FciError::IncompatibleIntegrals(format!(
            "{variant} needs restricted integrals; use the uhf variant"
        )));
    }
    Ok(())
}

fn require_ms0(space: &FciSpace, variant: SpinVariant) -> Result<()> {
    if !space.nelec().is_ms0() {
        return Err(FciError::IncompatibleIntegrals(format!(
            "{variant} needs equal alpha and beta electrons, got {}",
            space.nelec()
        )));
    }
    Ok(())
}

/// Restricted orbitals, any spin projection.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectSpin1;

impl FciKernel for DirectSpin1 {
    fn variant(&self) -> SpinVariant {
        SpinVariant::Spin1
    }

    fn check(&self, ints: &Integrals, _space: &FciSpace) -> Result<()> {
        require_restricted(ints, self.variant())
    }
}

/// Restricted orbitals with `n_alpha == n_beta`: one shared linkage table
/// and an exchange-symmetrised diagonal.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectMs0;

impl FciKernel for DirectMs0 {
    fn variant(&self) -> SpinVariant {
        SpinVariant::Ms0
    }

    fn check(&self, ints: &Integrals, space: &FciSpace) -> Result<()> {
        require_restricted(ints, self.variant())?;
        require_ms0(space, self.variant())
    }
}

/// MS=0 solver confined to CI matrices symmetric under alpha/beta exchange,
/// which excludes the odd-spin (triplet, ...) states.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectSpin0;

impl DirectSpin0 {
    pub fn symmetrize(civec: &DMatrix<f64>) -> DMatrix<f64> {
        (civec + civec.transpose()) * 0.5
    }
}

impl FciKernel for DirectSpin0 {
    fn variant(&self) -> SpinVariant {
        SpinVariant::Spin0
    }

    fn check(&self, ints: &Integrals, space: &FciSpace) -> Result<()> {
        require_restricted(ints, self.variant())?;
        require_ms0(space, self.variant())
    }

    fn contract_2e_into(
        &self,
        h2e: &AbsorbedHamiltonian,
        civec: &DMatrix<f64>,
        space: &FciSpace,
        out: &mut DMatrix<f64>,
        max_memory: f64,
    ) -> Result<()> {
        contract_impl::contract_2e_into(h2e, civec, space, out, max_memory)?;
        let sym = Self::symmetrize(out);
        out.copy_from(&sym);
        Ok(())
    }

    fn project(&self, civec: DMatrix<f64>) -> DMatrix<f64> {
        Self::symmetrize(&civec)
    }
}

/// Unrestricted orbitals: separate alpha and beta one-electron integrals and
/// `(aa, ab, bb)` two-electron blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectUhf;

impl FciKernel for DirectUhf {
    fn variant(&self) -> SpinVariant {
        SpinVariant::Uhf
    }

    fn check(&self, _ints: &Integrals, _space: &FciSpace) -> Result<()> {
        Ok(())
    }
}

/// Variant selection as it appears in job files and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpinVariant {
    /// Ms0 for `n_alpha == n_beta`, Spin1 otherwise, Uhf for unrestricted integrals
    #[default]
    Auto,
    Ms0,
    Spin0,
    Spin1,
    Uhf,
}

impl SpinVariant {
    /// Concrete variant for the given integrals and electron counts.
    pub fn resolve(self, ints: &Integrals, nelec: Nelec) -> SpinVariant {
        match self {
            SpinVariant::Auto if !ints.is_restricted() => SpinVariant::Uhf,
            SpinVariant::Auto if nelec.is_ms0() => SpinVariant::Ms0,
            SpinVariant::Auto => SpinVariant::Spin1,
            explicit => explicit,
        }
    }

    pub fn kernel(self, ints: &Integrals, nelec: Nelec) -> Box<dyn FciKernel> {
        match self.resolve(ints, nelec) {
            SpinVariant::Ms0 => Box::new(DirectMs0),
            SpinVariant::Spin0 => Box::new(DirectSpin0),
            SpinVariant::Uhf => Box::new(DirectUhf),
            SpinVariant::Spin1 | SpinVariant::Auto => Box::new(DirectSpin1),
        }
    }
}

impl FromStr for SpinVariant {
    type Err = FciError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(SpinVariant::Auto),
            "ms0" => Ok(SpinVariant::Ms0),
            "spin0" => Ok(SpinVariant::Spin0),
            "spin1" => Ok(SpinVariant::Spin1),
            "uhf" => Ok(SpinVariant::Uhf),
            _ => Err(FciError::InvalidConfiguration(format!(
                "unknown solver variant: {s}"
            ))),
        }
    }
}

impl fmt::Display for SpinVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpinVariant::Auto => "auto",
            SpinVariant::Ms0 => "ms0",
            SpinVariant::Spin0 => "spin0",
            SpinVariant::Spin1 => "spin1",
            SpinVariant::Uhf => "uhf",
        };
        f.write_str(name)
    }
}
