//! Shared test fixtures: random model Hamiltonians and a brute-force
//! second-quantised reference matrix.

use crate::cistring_impl::{make_strings, str2addr, FciSpace};
use crate::integrals::Integrals;
use crate::tensor::{num_pairs, Eri};
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub(crate) fn random_symmetric(n: usize, rng: &mut StdRng) -> DMatrix<f64> {
    let m = DMatrix::from_fn(n, n, |_, _| rng.gen_range(-1.0..1.0));
    (&m + m.transpose()) * 0.5
}

/// Random restricted integrals with full 8-fold symmetry and a
/// diagonally dominant one-electron part.
pub(crate) fn random_restricted(norb: usize, seed: u64) -> Integrals {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut h1e = random_symmetric(norb, &mut rng) * 0.3;
    for p in 0..norb {
        h1e[(p, p)] = -2.0 + 0.7 * p as f64;
    }
    let packed = random_symmetric(num_pairs(norb), &mut rng) * 0.2;
    let eri = Eri::from_packed(norb, packed).unwrap();
    Integrals::restricted(h1e, eri).unwrap()
}

/// Random unrestricted integrals; the mixed block has no `(pq|rs) = (rs|pq)` symmetry.
pub(crate) fn random_unrestricted(norb: usize, seed: u64) -> Integrals {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut h1e_a = random_symmetric(norb, &mut rng) * 0.3;
    let mut h1e_b = random_symmetric(norb, &mut rng) * 0.3;
    for p in 0..norb {
        h1e_a[(p, p)] = -2.0 + 0.7 * p as f64;
        h1e_b[(p, p)] = -1.8 + 0.6 * p as f64;
    }
    let npair = num_pairs(norb);
    let aa = Eri::from_packed(norb, random_symmetric(npair, &mut rng) * 0.2).unwrap();
    let bb = Eri::from_packed(norb, random_symmetric(npair, &mut rng) * 0.2).unwrap();
    let ab_packed = DMatrix::from_fn(npair, npair, |_, _| rng.gen_range(-0.1..0.1));
    let ab = Eri::from_packed(norb, ab_packed).unwrap();
    Integrals::unrestricted(h1e_a, h1e_b, aa, ab, bb).unwrap()
}

pub(crate) fn random_civec(space: &FciSpace, seed: u64) -> DMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let c = DMatrix::from_fn(space.na(), space.nb(), |_, _| rng.gen_range(-1.0..1.0));
    let norm = c.norm();
    c / norm
}

/// Determinant over spin orbitals: alpha orbital `p` is bit `p`,
/// beta orbital `p` is bit `norb + p`.
fn annihilate(det: u64, q: usize) -> Option<(u64, f64)> {
    if det & (1u64 << q) == 0 {
        return None;
    }
    let below = (det & ((1u64 << q) - 1)).count_ones();
    let sign = if below % 2 == 0 { 1.0 } else { -1.0 };
    Some((det ^ (1u64 << q), sign))
}

fn create(det: u64, p: usize) -> Option<(u64, f64)> {
    if det & (1u64 << p) != 0 {
        return None;
    }
    let below = (det & ((1u64 << p) - 1)).count_ones();
    let sign = if below % 2 == 0 { 1.0 } else { -1.0 };
    Some((det | (1u64 << p), sign))
}

/// Dense `<K|H|L>` over the determinant space, built operator by operator.
pub(crate) fn brute_force_hamiltonian(ints: &Integrals, space: &FciSpace) -> DMatrix<f64> {
    let norb = space.norb();
    let nelec = space.nelec();
    let strings_a = make_strings(norb, nelec.alpha).unwrap();
    let strings_b = make_strings(norb, nelec.beta).unwrap();
    let nb = strings_b.len();
    let ndet = space.ndet();
    let mask = (1u64 << norb) - 1;

    let address = |det: u64| {
        let ia = str2addr(norb, nelec.alpha, det & mask).unwrap();
        let ib = str2addr(norb, nelec.beta, det >> norb).unwrap();
        ia * nb + ib
    };
    let h1 = |spin: usize, p: usize, q: usize| {
        if spin == 0 {
            ints.h1e_alpha()[(p, q)]
        } else {
            ints.h1e_beta()[(p, q)]
        }
    };
    let g = |s1: usize, s2: usize, p: usize, q: usize, r: usize, s: usize| match (s1, s2) {
        (0, 0) => ints.eri_aa().get(p, q, r, s),
        (0, 1) => ints.eri_ab().get(p, q, r, s),
        (1, 0) => ints.eri_ab().get(r, s, p, q),
        _ => ints.eri_bb().get(p, q, r, s),
    };

    let mut h = DMatrix::zeros(ndet, ndet);
    for &sa in &strings_a {
        for &sb in &strings_b {
            let det = sa | (sb << norb);
            let col = address(det);
            for s1 in 0..2 {
                for p in 0..norb {
                    for q in 0..norb {
                        let (po, qo) = (p + s1 * norb, q + s1 * norb);
                        if let Some((d1, f1)) = annihilate(det, qo) {
                            if let Some((d2, f2)) = create(d1, po) {
                                h[(address(d2), col)] += h1(s1, p, q) * f1 * f2;
                            }
                        }
                        for s2 in 0..2 {
                            for r in 0..norb {
                                for s in 0..norb {
                                    let (ro, so) = (r + s2 * norb, s + s2 * norb);
                                    // a+_p a+_r a_s a_q
                                    let Some((d1, f1)) = annihilate(det, qo) else { continue };
                                    let Some((d2, f2)) = annihilate(d1, so) else { continue };
                                    let Some((d3, f3)) = create(d2, ro) else { continue };
                                    let Some((d4, f4)) = create(d3, po) else { continue };
                                    h[(address(d4), col)] +=
                                        0.5 * g(s1, s2, p, q, r, s) * f1 * f2 * f3 * f4;
                                }
                            }
                        }
                    }
                }
            }
        }
    }
    h
}

/// Eigenvalues in ascending order.
pub(crate) fn sorted_eigenvalues(h: &DMatrix<f64>) -> DVector<f64> {
    let eig = SymmetricEigen::new(h.clone());
    let mut values: Vec<f64> = eig.eigenvalues.iter().copied().collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    DVector::from_vec(values)
}

/// Flatten a CI matrix `[ia, ib]` into a determinant vector `ia * nb + ib`.
pub(crate) fn flatten(civec: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_fn(civec.nrows() * civec.ncols(), |k, _| {
        civec[(k / civec.ncols(), k % civec.ncols())]
    })
}
