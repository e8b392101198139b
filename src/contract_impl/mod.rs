//! Matrix-free Hamiltonian contraction
//!
//! The electronic Hamiltonian is applied to a CI vector without ever forming
//! the determinant-basis matrix. The one-electron integrals are first folded
//! into an effective two-electron operator ([`absorb_h1e`]) so that a single
//! two-body pass reproduces the whole Hamiltonian:
//!
//! 1. gather `T[pq][K] = <K|E_pq|c>` through the linkage tables,
//! 2. multiply `D = eri · T` with packed orbital-pair indexing,
//! 3. gather `σ[K] = Σ_pq <K|E_pq|D_pq>` back into the CI layout.
//!
//! The three steps run over batches of alpha strings sized so that the `T`
//! and `D` intermediates fit in `max_memory`; the final gather writes straight
//! into the caller's output, one determinant column per task.
//!
//! # Usage
//!
//! ```rust,ignore
//! let h2e = absorb_h1e(&integrals, space.nelec(), 0.5)?;
//! let sigma = contract_2e(&h2e, &civec, &space)?;
//! let e = civec.dot(&sigma);
//! ```

mod contract;

pub use contract::{
    absorb_h1e, alpha_batch_size, contract_1e, contract_1e_spin, contract_2e,
    contract_2e_batched, contract_2e_into, energy, AbsorbedHamiltonian, DEFAULT_MAX_MEMORY,
};
pub(crate) use contract::{gather_excitations, Channel};
