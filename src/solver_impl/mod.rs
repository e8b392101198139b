//! FCI solver and its spin variants
//!
//! [`FciSolver::kernel`] runs the full direct-CI procedure:
//!
//! 1. build the determinant space and its linkage tables,
//! 2. evaluate the Hamiltonian diagonal and an exact p-space block,
//! 3. return the p-space eigenpairs directly when they already span the
//!    whole space, are not degenerate and no restart vectors were given,
//! 4. otherwise iterate Davidson from the restart vectors or the projected
//!    p-space eigenvectors, with the p-space preconditioner and the
//!    matrix-free contraction (batched under `max_memory`) as the
//!    matrix-vector product.
//!
//! The [`FciKernel`] trait collects the operations every variant provides.
//! [`SpinVariant`] selects one: `spin1` (restricted, any spin), `ms0`
//! (restricted, `n_alpha == n_beta`), `spin0` (singlet-symmetric CI
//! matrices) and `uhf` (unrestricted integrals).
//!
//! # Usage
//!
//! ```rust,ignore
//! let solver = FciSolver::new(SolverConfig { nroots: 2, ..SolverConfig::default() });
//! let result = solver.kernel(&integrals, 6, (3, 3), None)?;
//! println!("E = {:.10}", result.energy() + ecore);
//! ```

mod solver;
#[cfg(test)]
mod tests;
mod variants;

pub use solver::{FciResult, FciSolver, SolverConfig};
pub use variants::{
    DirectMs0, DirectSpin0, DirectSpin1, DirectUhf, FciKernel, LinearOperator, SpinVariant,
};
