//! Four-index storage: packed two-electron integrals and 2-body density matrices

use crate::error::{FciError, Result};
use nalgebra::DMatrix;
use std::ops::{Index, IndexMut};

/// Packed lower-triangular index of the orbital pair `(p, q)`.
#[inline]
pub fn pair_index(p: usize, q: usize) -> usize {
    if p >= q {
        p * (p + 1) / 2 + q
    } else {
        q * (q + 1) / 2 + p
    }
}

/// Number of unique orbital pairs `p >= q`.
#[inline]
pub fn num_pairs(norb: usize) -> usize {
    norb * (norb + 1) / 2
}

/// Two-electron integrals `(pq|rs)` in chemist's notation, stored with
/// 4-fold permutational symmetry `(pq|rs) = (qp|rs) = (pq|sr) = (qp|sr)`.
///
/// The packed matrix has shape `npair x npair`; it is symmetric whenever the
/// integrals also carry the `(pq|rs) = (rs|pq)` symmetry (8-fold), which is
/// the case for restricted integrals but not for the mixed-spin block of an
/// unrestricted Hamiltonian.
#[derive(Debug, Clone, PartialEq)]
pub struct Eri {
    norb: usize,
    packed: DMatrix<f64>,
}

impl Eri {
    /// Build from a dense row-major `norb^4` slice indexed `[p][q][r][s]`.
    pub fn from_full(norb: usize, values: &[f64]) -> Result<Self> {
        let n4 = norb.pow(4);
        if values.len() != n4 {
            return Err(FciError::shape("eri (full)", n4, values.len()));
        }
        let n2 = norb * norb;
        Ok(Self::from_fn(norb, |p, q, r, s| {
            values[(p * norb + q) * n2 + r * norb + s]
        }))
    }

    pub fn from_packed(norb: usize, packed: DMatrix<f64>) -> Result<Self> {
        let npair = num_pairs(norb);
        if packed.nrows() != npair || packed.ncols() != npair {
            return Err(FciError::shape(
                "eri (packed)",
                format!("{npair}x{npair}"),
                format!("{}x{}", packed.nrows(), packed.ncols()),
            ));
        }
        Ok(Eri { norb, packed })
    }

    /// Build from a closure evaluated on the canonical `p >= q, r >= s` entries.
    pub fn from_fn<F>(norb: usize, f: F) -> Self
    where
        F: Fn(usize, usize, usize, usize) -> f64,
    {
        let npair = num_pairs(norb);
        let mut packed = DMatrix::zeros(npair, npair);
        for p in 0..norb {
            for q in 0..=p {
                let pq = pair_index(p, q);
                for r in 0..norb {
                    for s in 0..=r {
                        packed[(pq, pair_index(r, s))] = f(p, q, r, s);
                    }
                }
            }
        }
        Eri { norb, packed }
    }

    pub fn zeros(norb: usize) -> Self {
        let npair = num_pairs(norb);
        Eri {
            norb,
            packed: DMatrix::zeros(npair, npair),
        }
    }

    pub fn norb(&self) -> usize {
        self.norb
    }

    pub fn packed(&self) -> &DMatrix<f64> {
        &self.packed
    }

    pub(crate) fn packed_mut(&mut self) -> &mut DMatrix<f64> {
        &mut self.packed
    }

    #[inline]
    pub fn get(&self, p: usize, q: usize, r: usize, s: usize) -> f64 {
        self.packed[(pair_index(p, q), pair_index(r, s))]
    }

    /// `(pq|rs) -> (rs|pq)`; the identity for 8-fold symmetric integrals.
    pub fn swap_pairs(&self) -> Self {
        Eri {
            norb: self.norb,
            packed: self.packed.transpose(),
        }
    }

    pub fn scale(&self, factor: f64) -> Self {
        Eri {
            norb: self.norb,
            packed: &self.packed * factor,
        }
    }

    /// Dense row-major `norb^4` copy.
    pub fn to_full(&self) -> Vec<f64> {
        let n = self.norb;
        let mut full = vec![0.0; n.pow(4)];
        for p in 0..n {
            for q in 0..n {
                for r in 0..n {
                    for s in 0..n {
                        full[((p * n + q) * n + r) * n + s] = self.get(p, q, r, s);
                    }
                }
            }
        }
        full
    }
}

/// Dense 2-body density matrix `dm2[p,q,r,s]`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Rdm2 {
    norb: usize,
    data: Vec<f64>,
}

impl Rdm2 {
    pub fn zeros(norb: usize) -> Self {
        Rdm2 {
            norb,
            data: vec![0.0; norb.pow(4)],
        }
    }

    pub fn norb(&self) -> usize {
        self.norb
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    fn offset(&self, p: usize, q: usize, r: usize, s: usize) -> usize {
        ((p * self.norb + q) * self.norb + r) * self.norb + s
    }

    /// `Σ_pqrs (pq|rs) dm2[p,q,r,s]`
    pub fn contract_eri(&self, eri: &Eri) -> f64 {
        let n = self.norb;
        let mut total = 0.0;
        for p in 0..n {
            for q in 0..n {
                for r in 0..n {
                    for s in 0..n {
                        total += eri.get(p, q, r, s) * self[(p, q, r, s)];
                    }
                }
            }
        }
        total
    }

    pub fn max_abs_diff(&self, other: &Rdm2) -> f64 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

impl Index<(usize, usize, usize, usize)> for Rdm2 {
    type Output = f64;

    fn index(&self, (p, q, r, s): (usize, usize, usize, usize)) -> &f64 {
        &self.data[self.offset(p, q, r, s)]
    }
}

impl IndexMut<(usize, usize, usize, usize)> for Rdm2 {
    fn index_mut(&mut self, (p, q, r, s): (usize, usize, usize, usize)) -> &mut f64 {
        let idx = self.offset(p, q, r, s);
        &mut self.data[idx]
    }
}
