//! Exact Hamiltonian over a small set of low-energy determinants, and the
//! preconditioners built from it

use crate::cistring_impl::{cre_des_sign, occupied_orbitals, FciSpace};
use crate::davidson_impl::Preconditioner;
use crate::error::{FciError, Result};
use crate::integrals::Integrals;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use std::cmp::Ordering;
use tracing::debug;

/// Denominators are clamped so that `|1 / (h - e)|` never exceeds this.
const MAX_INVERSE: f64 = 1e8;

/// Selected determinant addresses and the dense Hamiltonian between them.
#[derive(Debug, Clone)]
pub struct PSpace {
    pub addresses: Vec<usize>,
    pub h0: DMatrix<f64>,
}

impl PSpace {
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Eigenpairs of `h0` with eigenvalues ascending.
    pub fn eigh(&self) -> (DVector<f64>, DMatrix<f64>) {
        crate::davidson_impl::eigh_sorted(self.h0.clone())
    }
}

/// The two orbitals that differ between a pair of single-excitation-related strings:
/// `(created, annihilated)` taking `ket` to `bra`.
fn single_difference(bra: u64, ket: u64) -> (usize, usize) {
    let created = (bra & !ket).trailing_zeros() as usize;
    let annihilated = (ket & !bra).trailing_zeros() as usize;
    (created, annihilated)
}

fn lowest_two(bits: u64) -> (usize, usize) {
    let first = bits.trailing_zeros() as usize;
    let rest = bits & !(1u64 << first);
    (first, rest.trailing_zeros() as usize)
}

/// Off-diagonal `<bra|H|ket>` by the Slater-Condon rules on raw integrals.
fn slater_condon(ints: &Integrals, bra: (u64, u64), ket: (u64, u64)) -> f64 {
    let (bra_a, bra_b) = bra;
    let (ket_a, ket_b) = ket;
    let da = (bra_a ^ ket_a).count_ones() / 2;
    let db = (bra_b ^ ket_b).count_ones() / 2;

    match (da, db) {
        (1, 0) => {
            let (a, i) = single_difference(bra_a, ket_a);
            let sign = cre_des_sign(a, i, ket_a) as f64;
            let aa = ints.eri_aa();
            let ab = ints.eri_ab();
            let mut v = ints.h1e_alpha()[(a, i)];
            for k in occupied_orbitals(ket_a) {
                v += aa.get(a, i, k, k) - aa.get(a, k, k, i);
            }
            for k in occupied_orbitals(ket_b) {
                v += ab.get(a, i, k, k);
            }
            sign * v
        }
        (0, 1) => {
            let (a, i) = single_difference(bra_b, ket_b);
            let sign = cre_des_sign(a, i, ket_b) as f64;
            let bb = ints.eri_bb();
            let ab = ints.eri_ab();
            let mut v = ints.h1e_beta()[(a, i)];
            for k in occupied_orbitals(ket_b) {
                v += bb.get(a, i, k, k) - bb.get(a, k, k, i);
            }
            for k in occupied_orbitals(ket_a) {
                v += ab.get(k, k, a, i);
            }
            sign * v
        }
        (2, 0) | (0, 2) => {
            let (bra_s, ket_s, eri) = if da == 2 {
                (bra_a, ket_a, ints.eri_aa())
            } else {
                (bra_b, ket_b, ints.eri_bb())
            };
            let (i, j) = lowest_two(ket_s & !bra_s);
            let (a, b) = lowest_two(bra_s & !ket_s);
            let s1 = cre_des_sign(a, i, ket_s);
            let mid = (ket_s ^ (1u64 << i)) | (1u64 << a);
            let s2 = cre_des_sign(b, j, mid);
            (s1 * s2) as f64 * (eri.get(a, i, b, j) - eri.get(a, j, b, i))
        }
        (1, 1) => {
            let (a, i) = single_difference(bra_a, ket_a);
            let (b, j) = single_difference(bra_b, ket_b);
            let sa = cre_des_sign(a, i, ket_a);
            let sb = cre_des_sign(b, j, ket_b);
            (sa * sb) as f64 * ints.eri_ab().get(a, i, b, j)
        }
        _ => 0.0,
    }
}

/// The `np` lowest-diagonal determinants (ties broken by address) and their
/// exact Hamiltonian block, diagonal taken from `hdiag`.
pub fn pspace(
    ints: &Integrals,
    hdiag: &DVector<f64>,
    space: &FciSpace,
    np: usize,
) -> Result<PSpace> {
    ints.check_norb(space.norb())?;
    if hdiag.len() != space.ndet() {
        return Err(FciError::shape("hdiag", space.ndet(), hdiag.len()));
    }

    let nb = space.nb();
    let mut order: Vec<usize> = (0..hdiag.len()).collect();
    order.sort_by(|&x, &y| {
        hdiag[x]
            .partial_cmp(&hdiag[y])
            .unwrap_or(Ordering::Equal)
            .then(x.cmp(&y))
    });
    order.truncate(np.min(hdiag.len()));
    let addresses = order;

    let dets: Vec<(u64, u64)> = addresses
        .iter()
        .map(|&k| {
            (
                space.links_a().string(k / nb),
                space.links_b().string(k % nb),
            )
        })
        .collect();

    let n = addresses.len();
    let rows: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| {
            (0..i)
                .map(|j| slater_condon(ints, dets[i], dets[j]))
                .collect()
        })
        .collect();

    let mut h0 = DMatrix::zeros(n, n);
    for (i, row) in rows.into_iter().enumerate() {
        for (j, v) in row.into_iter().enumerate() {
            h0[(i, j)] = v;
            h0[(j, i)] = v;
        }
        h0[(i, i)] = hdiag[addresses[i]];
    }

    debug!("p-space: {} determinants selected", n);
    Ok(PSpace { addresses, h0 })
}

fn clamped_inverse(x: f64) -> f64 {
    let inv = 1.0 / x;
    if inv.abs() > MAX_INVERSE || !inv.is_finite() {
        MAX_INVERSE.copysign(x)
    } else {
        inv
    }
}

/// Olsen-corrected preconditioner: the shifted inverse Hamiltonian is
/// applied exactly inside the p-space and by its diagonal outside.
#[derive(Debug, Clone)]
pub struct PSpacePreconditioner {
    hdiag: DVector<f64>,
    eigenvalues: DVector<f64>,
    eigenvectors: DMatrix<f64>,
    addresses: Vec<usize>,
    level_shift: f64,
}

impl PSpacePreconditioner {
    pub fn new(
        hdiag: DVector<f64>,
        eigenvalues: DVector<f64>,
        eigenvectors: DMatrix<f64>,
        addresses: Vec<usize>,
        level_shift: f64,
    ) -> Self {
        PSpacePreconditioner {
            hdiag,
            eigenvalues,
            eigenvectors,
            addresses,
            level_shift,
        }
    }

    /// `M x` with `M = (H0 - e)^-1` on the p-space and `1 / (hdiag - e)` elsewhere.
    fn apply(&self, x: &DVector<f64>, h0e0inv: &DMatrix<f64>, e: f64) -> DVector<f64> {
        let mut out = DVector::from_fn(x.len(), |k, _| x[k] * clamped_inverse(self.hdiag[k] - e));
        let sub = DVector::from_fn(self.addresses.len(), |i, _| x[self.addresses[i]]);
        let projected = h0e0inv * sub;
        for (i, &k) in self.addresses.iter().enumerate() {
            out[k] = projected[i];
        }
        out
    }
}

impl Preconditioner for PSpacePreconditioner {
    fn precondition(&self, residual: &DVector<f64>, e0: f64, x0: &DVector<f64>) -> DVector<f64> {
        let e = e0 - self.level_shift;
        let weights = self.eigenvalues.map(|w| clamped_inverse(w - e));
        let h0e0inv = &self.eigenvectors
            * DMatrix::from_diagonal(&weights)
            * self.eigenvectors.transpose();

        let m_r = self.apply(residual, &h0e0inv, e);
        let m_x0 = self.apply(x0, &h0e0inv, e);
        let denom = x0.dot(&m_x0);
        let e1 = if denom.abs() > f64::EPSILON {
            x0.dot(&m_r) / denom
        } else {
            0.0
        };
        self.apply(&(residual - x0 * e1), &h0e0inv, e)
    }
}

/// `r / (hdiag - (e0 - shift))` with small denominators clamped.
#[derive(Debug, Clone)]
pub struct DiagonalPreconditioner {
    hdiag: DVector<f64>,
    level_shift: f64,
}

impl DiagonalPreconditioner {
    pub fn new(hdiag: DVector<f64>, level_shift: f64) -> Self {
        DiagonalPreconditioner { hdiag, level_shift }
    }
}

impl Preconditioner for DiagonalPreconditioner {
    fn precondition(&self, residual: &DVector<f64>, e0: f64, _x0: &DVector<f64>) -> DVector<f64> {
        let e = e0 - self.level_shift;
        DVector::from_fn(residual.len(), |k, _| {
            residual[k] * clamped_inverse(self.hdiag[k] - e)
        })
    }
}
