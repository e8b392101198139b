//! Matrix-free Davidson eigensolver
//!
//! The Davidson method targets the lowest eigenpairs of large, diagonally
//! dominant symmetric operators that are only available through their
//! action on a vector. Each cycle:
//!
//! - projects the operator onto the current orthonormal subspace and
//!   diagonalises the projection,
//! - forms Ritz vectors and residuals `r = H x - e x`,
//! - stops once every requested root has `|dE| < conv_tol` and
//!   `|r| < residual_tol`,
//! - otherwise expands the subspace with preconditioned residuals,
//!   collapsing onto the Ritz vectors when `max_space` would be exceeded.
//!
//! # Usage
//!
//! ```rust,ignore
//! let precond = DiagonalPreconditioner::new(hdiag.clone(), 1e-3);
//! let result = davidson(|x| Ok(&a * x), &[guess], &precond, &DavidsonOptions::default())?;
//! println!("E0 = {}", result.energies[0]);
//! ```

mod davidson;

pub use davidson::{
    davidson, eigh_sorted, DavidsonOptions, DavidsonResult, IterationRecord, Preconditioner,
};
