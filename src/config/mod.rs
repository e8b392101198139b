//! Configuration for FCI jobs
//!
//! A job file carries the active-space Hamiltonian (orbital count, electron
//! count, core energy, one- and two-electron integrals) and an optional
//! `solver` block. Missing solver parameters are filled in by
//! [`FciParams::with_defaults`]; command-line flags override both.

mod args;

pub use args::Args;

use crate::cistring_impl::Nelec;
use crate::solver_impl::{SolverConfig, SpinVariant};
use serde::{Deserialize, Serialize};

/// Electron count as either a total or an `[alpha, beta]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum NelecSpec {
    Total(usize),
    Split([usize; 2]),
}

impl From<NelecSpec> for Nelec {
    fn from(spec: NelecSpec) -> Self {
        match spec {
            NelecSpec::Total(total) => Nelec::from_total(total),
            NelecSpec::Split([alpha, beta]) => Nelec::new(alpha, beta),
        }
    }
}

/// Main job configuration
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub norb: usize,
    pub nelec: NelecSpec,
    /// Constant added to every electronic energy (nuclear repulsion, frozen core)
    pub ecore: Option<f64>,
    /// Alpha (or spin-free) one-electron integrals, `norb` rows
    pub h1e: Vec<Vec<f64>>,
    /// `(pq|rs)`, flattened row-major over `norb^4`
    pub eri: Vec<f64>,
    pub h1e_b: Option<Vec<Vec<f64>>>,
    pub eri_ab: Option<Vec<f64>>,
    pub eri_bb: Option<Vec<f64>>,
    pub solver: Option<FciParams>,
    pub rdm: Option<bool>,
}

impl Config {
    pub fn is_unrestricted(&self) -> bool {
        self.h1e_b.is_some() || self.eri_ab.is_some() || self.eri_bb.is_some()
    }
}

/// Solver parameters as they appear in the job file
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FciParams {
    pub conv_tol: Option<f64>,
    pub residual_tol: Option<f64>,
    pub lindep: Option<f64>,
    pub max_cycle: Option<usize>,
    pub max_space: Option<usize>,
    pub level_shift: Option<f64>,
    pub max_memory: Option<f64>,
    pub nroots: Option<usize>,
    pub pspace_size: Option<usize>,
    pub spin: Option<SpinVariant>,
}

impl Default for FciParams {
    fn default() -> Self {
        let defaults = SolverConfig::default();
        FciParams {
            conv_tol: Some(defaults.conv_tol),
            residual_tol: None,
            lindep: Some(defaults.lindep),
            max_cycle: Some(defaults.max_cycle),
            max_space: Some(defaults.max_space),
            level_shift: Some(defaults.level_shift),
            max_memory: Some(defaults.max_memory),
            nroots: Some(defaults.nroots),
            pspace_size: Some(defaults.pspace_size),
            spin: Some(defaults.spin),
        }
    }
}

impl FciParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.conv_tol.is_none() {
            self.conv_tol = defaults.conv_tol;
        }
        if self.lindep.is_none() {
            self.lindep = defaults.lindep;
        }
        if self.max_cycle.is_none() {
            self.max_cycle = defaults.max_cycle;
        }
        if self.max_space.is_none() {
            self.max_space = defaults.max_space;
        }
        if self.level_shift.is_none() {
            self.level_shift = defaults.level_shift;
        }
        if self.max_memory.is_none() {
            self.max_memory = defaults.max_memory;
        }
        if self.nroots.is_none() {
            self.nroots = defaults.nroots;
        }
        if self.pspace_size.is_none() {
            self.pspace_size = defaults.pspace_size;
        }
        if self.spin.is_none() {
            self.spin = defaults.spin;
        }
        self
    }

    /// Resolved solver settings; unset fields take the library defaults.
    pub fn to_solver_config(&self) -> SolverConfig {
        let defaults = SolverConfig::default();
        SolverConfig {
            conv_tol: self.conv_tol.unwrap_or(defaults.conv_tol),
            residual_tol: self.residual_tol,
            lindep: self.lindep.unwrap_or(defaults.lindep),
            max_cycle: self.max_cycle.unwrap_or(defaults.max_cycle),
            max_space: self.max_space.unwrap_or(defaults.max_space),
            level_shift: self.level_shift.unwrap_or(defaults.level_shift),
            max_memory: self.max_memory.unwrap_or(defaults.max_memory),
            nroots: self.nroots.unwrap_or(defaults.nroots),
            pspace_size: self.pspace_size.unwrap_or(defaults.pspace_size),
            spin: self.spin.unwrap_or(defaults.spin),
        }
    }
}
