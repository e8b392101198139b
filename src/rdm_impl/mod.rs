//! One- and two-particle reduced density matrices
//!
//! Conventions: `dm1[p,q] = <bra|p+ q|ket>` and the raw two-body matrix
//! `dm2[p,q,r,s] = <bra|p+ q r+ s|ket>`. [`reorder_rdm`] turns the raw form
//! into `<p+ r+ s q>`, for which
//!
//! `E = Σ_pq h_pq dm1[p,q] + ½ Σ_pqrs (pq|rs) dm2[p,q,r,s]`.

mod rdm;

pub use rdm::{
    make_rdm1, make_rdm12, make_rdm1s, reorder_rdm, trans_rdm1, trans_rdm12, trans_rdm1s,
};
