//! Full configuration interaction on an active-space Hamiltonian.
//!
//! The crate enumerates alpha and beta occupation strings, applies the
//! Hamiltonian to CI vectors through single-excitation tables, and finds the
//! lowest eigenpairs with a preconditioned Davidson solver. Reduced density
//! matrices are available for any converged root.

pub mod app;
pub mod cistring_impl;
pub mod config;
pub mod contract_impl;
pub mod davidson_impl;
pub mod error;
pub mod hdiag_impl;
pub mod integrals;
pub mod io;
pub mod rdm_impl;
pub mod solver_impl;
pub mod tensor;

#[cfg(test)]
mod testing;

pub use cistring_impl::{FciSpace, LinkTable, Nelec};
pub use contract_impl::{
    absorb_h1e, contract_1e, contract_2e, contract_2e_into, energy, AbsorbedHamiltonian,
    DEFAULT_MAX_MEMORY,
};
pub use davidson_impl::{davidson, DavidsonOptions, DavidsonResult, Preconditioner};
pub use error::{FciError, Result};
pub use hdiag_impl::{make_hdiag, pspace, PSpace};
pub use integrals::Integrals;
pub use rdm_impl::{make_rdm1, make_rdm12, make_rdm1s, reorder_rdm, trans_rdm1, trans_rdm12, trans_rdm1s};
pub use solver_impl::{FciKernel, FciResult, FciSolver, SolverConfig, SpinVariant};
pub use tensor::{Eri, Rdm2};
