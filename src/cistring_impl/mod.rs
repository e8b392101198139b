//! Determinant strings and linkage tables
//!
//! A determinant is the product of an alpha string and a beta string. Each
//! string is an occupation bit mask with a canonical address given by the
//! combinatorial number system, so that the `C(norb, nelec)` strings are
//! numbered in increasing integer order.
//!
//! The linkage table lists, for every string, every single excitation
//! `E_ai = a+_a a_i` that keeps the string valid, together with the address of
//! the resulting string and the fermionic sign. All matrix-free kernels
//! (contraction, RDMs) are driven by these tables.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rust_fci::FciSpace;
//!
//! let space = FciSpace::new(6, (3, 3))?;
//! for entry in space.links_a().links(0) {
//!     println!("{} <- {} sign {} -> {}", entry.create, entry.annihilate, entry.sign, entry.address);
//! }
//! ```

mod cistring;
#[cfg(test)]
mod tests;

pub use cistring::{
    addr2str, cre_des_sign, make_strings, num_strings, occupied_orbitals, str2addr, FciSpace,
    LinkEntry, LinkTable, Nelec, MAX_ORBITALS,
};
