//! Diagonal of the Hamiltonian in the determinant basis

use crate::cistring_impl::{FciSpace, LinkTable};
use crate::error::Result;
use crate::integrals::Integrals;
use crate::tensor::Eri;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::debug;

/// `Σ_i h_ii + ½ Σ_ij (J_ij - K_ij)` for every string of one spin.
fn same_spin_energies(table: &LinkTable, h1e: &DMatrix<f64>, eri: &Eri) -> Vec<f64> {
    (0..table.num_strings())
        .into_par_iter()
        .map(|addr| {
            let occ: Vec<usize> = table.occupations(addr).collect();
            let mut e = 0.0;
            for &i in &occ {
                e += h1e[(i, i)];
                for &j in &occ {
                    e += 0.5 * (eri.get(i, i, j, j) - eri.get(i, j, j, i));
                }
            }
            e
        })
        .collect()
}

/// `<I|H|I>` for every determinant, flattened as `ia * nb + ib`.
pub fn make_hdiag(ints: &Integrals, space: &FciSpace) -> Result<DVector<f64>> {
    ints.check_norb(space.norb())?;
    let (na, nb) = (space.na(), space.nb());
    let links_a = space.links_a();
    let links_b = space.links_b();

    let e_alpha = same_spin_energies(links_a, ints.h1e_alpha(), ints.eri_aa());
    let e_beta = same_spin_energies(links_b, ints.h1e_beta(), ints.eri_bb());
    let occ_b: Vec<Vec<usize>> = (0..nb).map(|ib| links_b.occupations(ib).collect()).collect();
    let eri_ab = ints.eri_ab();

    let rows: Vec<Vec<f64>> = (0..na)
        .into_par_iter()
        .map(|ia| {
            let occ_a: Vec<usize> = links_a.occupations(ia).collect();
            (0..nb)
                .map(|ib| {
                    let coulomb: f64 = occ_a
                        .iter()
                        .flat_map(|&i| occ_b[ib].iter().map(move |&j| (i, j)))
                        .map(|(i, j)| eri_ab.get(i, i, j, j))
                        .sum();
                    e_alpha[ia] + e_beta[ib] + coulomb
                })
                .collect()
        })
        .collect();

    let mut hdiag = DVector::from_iterator(na * nb, rows.into_iter().flatten());

    // exchange-symmetric for MS=0; average out the rounding asymmetry
    if ints.is_restricted() && space.nelec().is_ms0() {
        let raw = hdiag.clone();
        for ia in 0..na {
            for ib in 0..nb {
                hdiag[ia * nb + ib] = 0.5 * (raw[ia * nb + ib] + raw[ib * nb + ia]);
            }
        }
    }

    debug!(
        "hdiag: {} determinants, lowest {:.10}",
        hdiag.len(),
        hdiag.min()
    );
    Ok(hdiag)
}
