//! Hamiltonian diagonal, p-space and preconditioners
//!
//! `make_hdiag` evaluates `<I|H|I>` for every determinant from per-string
//! partial sums. `pspace` picks the lowest-diagonal determinants and builds
//! their exact Hamiltonian block with the Slater-Condon rules; its
//! eigenpairs give both the starting guess and the Olsen-corrected
//! [`PSpacePreconditioner`] used by the Davidson iterations.

mod hdiag;
mod pspace;

pub use hdiag::make_hdiag;
pub use pspace::{pspace, DiagonalPreconditioner, PSpace, PSpacePreconditioner};
