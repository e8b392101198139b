//! Direct-CI contraction of the Hamiltonian with a CI vector

use crate::cistring_impl::{FciSpace, LinkEntry, Nelec};
use crate::error::{FciError, Result};
use crate::integrals::Integrals;
use crate::tensor::{num_pairs, pair_index, Eri};
use nalgebra::DMatrix;
use rayon::prelude::*;
use std::ops::Range;
use tracing::debug;

/// Two-electron-only operator with the one-electron part folded in.
///
/// With `fac = 0.5` the operator `Σ h2e[pq,rs] E_pq E_rs` equals the full
/// electronic Hamiltonian inside the N-electron space:
///
/// eri_{pq,rs} = (pq|rs) - (.5/N) [Σ_q (pq|qs) + Σ_p (pq|rp)] + (h_pq δ_rs + δ_pq h_rs) / N
#[derive(Debug, Clone)]
pub enum AbsorbedHamiltonian {
    Restricted(Eri),
    /// `(aa, ab, bb)` blocks
    Unrestricted([Eri; 3]),
}

impl AbsorbedHamiltonian {
    pub fn norb(&self) -> usize {
        match self {
            AbsorbedHamiltonian::Restricted(eri) => eri.norb(),
            AbsorbedHamiltonian::Unrestricted(blocks) => blocks[0].norb(),
        }
    }
}

/// `f[j,k] = h[j,k] - 1/2 Σ_i (ji|ik)`, divided by the electron count.
fn effective_one_body(h1e: &DMatrix<f64>, eri: &Eri, nelec_total: usize) -> DMatrix<f64> {
    let norb = eri.norb();
    if nelec_total == 0 {
        return DMatrix::zeros(norb, norb);
    }
    let scale = 1.0 / nelec_total as f64;
    DMatrix::from_fn(norb, norb, |j, k| {
        let exchange: f64 = (0..norb).map(|i| eri.get(j, i, i, k)).sum();
        (h1e[(j, k)] - 0.5 * exchange) * scale
    })
}

/// Add `row[pq]` to every `(kk, pq)` element and `col[pq]` to every `(pq, kk)` element.
fn fold_diagonal_pairs(eri: &mut Eri, row: &DMatrix<f64>, col: &DMatrix<f64>) {
    let norb = eri.norb();
    let packed = eri.packed_mut();
    for k in 0..norb {
        let kk = pair_index(k, k);
        for p in 0..norb {
            for q in 0..=p {
                let pq = pair_index(p, q);
                packed[(kk, pq)] += row[(p, q)];
                packed[(pq, kk)] += col[(p, q)];
            }
        }
    }
}

/// Fold `h1e` into the two-electron integrals and scale by `fac`.
pub fn absorb_h1e(ints: &Integrals, nelec: Nelec, fac: f64) -> Result<AbsorbedHamiltonian> {
    let n = nelec.total();
    match ints {
        Integrals::Restricted { h1e, eri } => {
            let f1e = effective_one_body(h1e, eri, n);
            let mut h2e = eri.clone();
            fold_diagonal_pairs(&mut h2e, &f1e, &f1e);
            Ok(AbsorbedHamiltonian::Restricted(h2e.scale(fac)))
        }
        Integrals::Unrestricted { h1e, eri } => {
            let f1e_a = effective_one_body(&h1e[0], &eri[0], n);
            let f1e_b = effective_one_body(&h1e[1], &eri[2], n);
            let mut aa = eri[0].clone();
            let mut ab = eri[1].clone();
            let mut bb = eri[2].clone();
            fold_diagonal_pairs(&mut aa, &f1e_a, &f1e_a);
            fold_diagonal_pairs(&mut ab, &f1e_b, &f1e_a);
            fold_diagonal_pairs(&mut bb, &f1e_b, &f1e_b);
            Ok(AbsorbedHamiltonian::Unrestricted([
                aa.scale(fac),
                ab.scale(fac),
                bb.scale(fac),
            ]))
        }
    }
}

/// Which string excitations a gather pass walks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Channel {
    Alpha,
    Beta,
    Both,
}

impl Channel {
    fn alpha(self) -> bool {
        matches!(self, Channel::Alpha | Channel::Both)
    }

    fn beta(self) -> bool {
        matches!(self, Channel::Beta | Channel::Both)
    }
}

/// Megabytes a contraction may spend on intermediates when no budget is given.
pub const DEFAULT_MAX_MEMORY: f64 = 2000.0;

/// Excitation vectors `T[idx(e)][K] = Σ_links(K) sign * c[K']` for the
/// determinants `K = (ia, ib)` with `ia` in `rows`, one column per
/// determinant at `(ia - rows.start) * nb + ib`.
///
/// A link `e = (a, i, K', sign)` of `K` means `<K|E_ia|K'> = sign`, so with
/// `idx(e) = i * norb + a` the column holds `<K|E_xy|c>` for every orbital pair;
/// with `idx(e) = pair(a, i)` it holds `<K|E_xy + E_yx|c>` packed.
pub(crate) fn gather_excitations<F>(
    civec: &DMatrix<f64>,
    space: &FciSpace,
    rows: Range<usize>,
    channel: Channel,
    width: usize,
    index: F,
) -> DMatrix<f64>
where
    F: Fn(&LinkEntry) -> usize + Sync,
{
    let nb = space.nb();
    let links_a = space.links_a();
    let links_b = space.links_b();
    let first = rows.start;
    let mut data = vec![0.0; width * rows.len() * nb];

    data.par_chunks_mut((width * nb).max(1))
        .enumerate()
        .for_each(|(offset, block)| {
            let ia = first + offset;
            for ib in 0..nb {
                let column = &mut block[ib * width..(ib + 1) * width];
                if channel.alpha() {
                    for e in links_a.links(ia) {
                        column[index(e)] += e.signf() * civec[(e.address, ib)];
                    }
                }
                if channel.beta() {
                    for e in links_b.links(ib) {
                        column[index(e)] += e.signf() * civec[(ia, e.address)];
                    }
                }
            }
        });

    DMatrix::from_vec(width, rows.len() * nb, data)
}

/// Accumulate `σ[K] += Σ_pq <K|E_pq|D_pq>` for the intermediates `D` of the
/// alpha strings in `rows`.
///
/// Alpha excitations leave `ib` unchanged and beta excitations leave `ia`
/// unchanged, so every column `ib` of the column-major `out` only receives
/// contributions computed from that column; columns are filled in parallel.
fn scatter_excitations<F>(
    d_alpha: &DMatrix<f64>,
    d_beta: &DMatrix<f64>,
    space: &FciSpace,
    rows: Range<usize>,
    out: &mut DMatrix<f64>,
    index: F,
) where
    F: Fn(&LinkEntry) -> usize + Sync,
{
    let (na, nb) = (space.na(), space.nb());
    let links_a = space.links_a();
    let links_b = space.links_b();
    let first = rows.start;

    out.as_mut_slice()
        .par_chunks_mut(na)
        .enumerate()
        .for_each(|(ib, column)| {
            for ia in rows.clone() {
                let local = (ia - first) * nb;
                // <K|E_ai|K'> = <K'|E_ia|K>: links of K' name the targets K
                let source = d_alpha.column(local + ib);
                for e in links_a.links(ia) {
                    column[e.address] += e.signf() * source[index(e)];
                }
                let mut acc = 0.0;
                for e in links_b.links(ib) {
                    acc += e.signf() * d_beta[(index(e), local + e.address)];
                }
                column[ia] += acc;
            }
        });
}

/// Intermediate matrices held per alpha string while contracting.
fn intermediates_per_row(h2e: &AbsorbedHamiltonian) -> usize {
    match h2e {
        AbsorbedHamiltonian::Restricted(_) => 2,
        AbsorbedHamiltonian::Unrestricted(_) => 4,
    }
}

/// Number of alpha strings contracted together so that the `T` and `D`
/// intermediates stay within `max_memory` megabytes. At least one string.
pub fn alpha_batch_size(h2e: &AbsorbedHamiltonian, space: &FciSpace, max_memory: f64) -> usize {
    let npair = num_pairs(space.norb());
    let bytes_per_row =
        intermediates_per_row(h2e) * npair * space.nb() * std::mem::size_of::<f64>();
    let fits = (max_memory * 1024.0 * 1024.0 / bytes_per_row.max(1) as f64) as usize;
    fits.clamp(1, space.na())
}

fn check_contraction(
    h2e: &AbsorbedHamiltonian,
    civec: &DMatrix<f64>,
    space: &FciSpace,
    out: &DMatrix<f64>,
) -> Result<()> {
    space.check_civec(civec)?;
    space.check_civec(out)?;
    if h2e.norb() != space.norb() {
        return Err(FciError::shape("h2e (norb)", space.norb(), h2e.norb()));
    }
    Ok(())
}

/// `σ = Σ_{pq,rs} h2e[pq,rs] E_pq E_rs c` into `out`, `batch` alpha strings
/// at a time.
pub fn contract_2e_batched(
    h2e: &AbsorbedHamiltonian,
    civec: &DMatrix<f64>,
    space: &FciSpace,
    out: &mut DMatrix<f64>,
    batch: usize,
) -> Result<()> {
    check_contraction(h2e, civec, space, out)?;

    let na = space.na();
    let npair = num_pairs(space.norb());
    let batch = batch.clamp(1, na);
    let by_pair = |e: &LinkEntry| e.pair_index();
    out.fill(0.0);

    for start in (0..na).step_by(batch) {
        let rows = start..(start + batch).min(na);
        match h2e {
            AbsorbedHamiltonian::Restricted(eri) => {
                let t = gather_excitations(
                    civec,
                    space,
                    rows.clone(),
                    Channel::Both,
                    npair,
                    by_pair,
                );
                let d = eri.packed() * t;
                scatter_excitations(&d, &d, space, rows, out, by_pair);
            }
            AbsorbedHamiltonian::Unrestricted([aa, ab, bb]) => {
                let t_a =
                    gather_excitations(civec, space, rows.clone(), Channel::Alpha, npair, by_pair);
                let t_b =
                    gather_excitations(civec, space, rows.clone(), Channel::Beta, npair, by_pair);
                let mut d_a = aa.packed() * &t_a;
                d_a.gemm(1.0, ab.packed(), &t_b, 1.0);
                let mut d_b = bb.packed() * &t_b;
                d_b.gemm_tr(1.0, ab.packed(), &t_a, 1.0);
                scatter_excitations(&d_a, &d_b, space, rows, out, by_pair);
            }
        }
    }
    Ok(())
}

/// `σ = Σ_{pq,rs} h2e[pq,rs] E_pq E_rs c`, written into a caller-owned buffer
/// with the intermediates bounded by `max_memory` megabytes.
pub fn contract_2e_into(
    h2e: &AbsorbedHamiltonian,
    civec: &DMatrix<f64>,
    space: &FciSpace,
    out: &mut DMatrix<f64>,
    max_memory: f64,
) -> Result<()> {
    check_contraction(h2e, civec, space, out)?;
    let batch = alpha_batch_size(h2e, space, max_memory);
    debug!(
        "contract_2e: {} determinants, {} orbital pairs, {} alpha strings per batch",
        space.ndet(),
        num_pairs(space.norb()),
        batch
    );
    contract_2e_batched(h2e, civec, space, out, batch)
}

pub fn contract_2e(
    h2e: &AbsorbedHamiltonian,
    civec: &DMatrix<f64>,
    space: &FciSpace,
) -> Result<DMatrix<f64>> {
    let mut out = DMatrix::zeros(space.na(), space.nb());
    contract_2e_into(h2e, civec, space, &mut out, DEFAULT_MAX_MEMORY)?;
    Ok(out)
}

/// `σ = Σ_pq (f_a[p,q] E^α_pq + f_b[p,q] E^β_pq) c`
pub fn contract_1e_spin(
    f1e_a: &DMatrix<f64>,
    f1e_b: &DMatrix<f64>,
    civec: &DMatrix<f64>,
    space: &FciSpace,
) -> Result<DMatrix<f64>> {
    space.check_civec(civec)?;
    space.check_one_body("f1e (alpha)", f1e_a)?;
    space.check_one_body("f1e (beta)", f1e_b)?;

    let na = space.na();
    let links_a = space.links_a();
    let links_b = space.links_b();
    let mut out = DMatrix::zeros(na, space.nb());

    // <K|E_ia|K'> = sign for a link (a, i, K') of K
    out.as_mut_slice()
        .par_chunks_mut(na)
        .enumerate()
        .for_each(|(ib, column)| {
            for (ia, value) in column.iter_mut().enumerate() {
                let alpha: f64 = links_a
                    .links(ia)
                    .iter()
                    .map(|e| {
                        e.signf() * f1e_a[(e.annihilate(), e.create())] * civec[(e.address, ib)]
                    })
                    .sum();
                let beta: f64 = links_b
                    .links(ib)
                    .iter()
                    .map(|e| {
                        e.signf() * f1e_b[(e.annihilate(), e.create())] * civec[(ia, e.address)]
                    })
                    .sum();
                *value = alpha + beta;
            }
        });
    Ok(out)
}

/// Spin-free one-electron contraction.
pub fn contract_1e(
    f1e: &DMatrix<f64>,
    civec: &DMatrix<f64>,
    space: &FciSpace,
) -> Result<DMatrix<f64>> {
    contract_1e_spin(f1e, f1e, civec, space)
}

/// `<c|H|c>`; the defining relation `c · contract_2e(absorb_h1e(h, g, .5), c)`.
pub fn energy(ints: &Integrals, civec: &DMatrix<f64>, space: &FciSpace) -> Result<f64> {
    ints.check_norb(space.norb())?;
    let h2e = absorb_h1e(ints, space.nelec(), 0.5)?;
    let sigma = contract_2e(&h2e, civec, space)?;
    Ok(civec.dot(&sigma))
}
