//! Reduced density matrices from CI vectors

use crate::cistring_impl::{FciSpace, LinkEntry};
use crate::contract_impl::{gather_excitations, Channel};
use crate::error::{FciError, Result};
use crate::tensor::Rdm2;
use nalgebra::DMatrix;

/// `T[(p, q)][K] = <K|E_pq|c>` with `(p, q)` flattened as `p * norb + q`.
fn excitation_vectors(civec: &DMatrix<f64>, space: &FciSpace, channel: Channel) -> DMatrix<f64> {
    let norb = space.norb();
    gather_excitations(civec, space, 0..space.na(), channel, norb * norb, |e: &LinkEntry| {
        e.annihilate() * norb + e.create()
    })
}

fn check_pair(bra: &DMatrix<f64>, ket: &DMatrix<f64>, space: &FciSpace) -> Result<()> {
    space.check_civec(bra)?;
    space.check_civec(ket)
}

/// `dm1[p,q] = <bra|E_pq|ket>` restricted to one channel.
fn one_body(
    bra: &DMatrix<f64>,
    ket: &DMatrix<f64>,
    space: &FciSpace,
    channel: Channel,
) -> DMatrix<f64> {
    let norb = space.norb();
    let t_ket = excitation_vectors(ket, space, channel);
    let flat = t_ket * space.flatten(bra);
    DMatrix::from_fn(norb, norb, |p, q| flat[p * norb + q])
}

/// Alpha and beta transition 1-RDMs `<bra|p+ q|ket>`.
pub fn trans_rdm1s(
    bra: &DMatrix<f64>,
    ket: &DMatrix<f64>,
    space: &FciSpace,
) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
    check_pair(bra, ket, space)?;
    Ok((
        one_body(bra, ket, space, Channel::Alpha),
        one_body(bra, ket, space, Channel::Beta),
    ))
}

/// Spin-summed transition 1-RDM.
pub fn trans_rdm1(
    bra: &DMatrix<f64>,
    ket: &DMatrix<f64>,
    space: &FciSpace,
) -> Result<DMatrix<f64>> {
    check_pair(bra, ket, space)?;
    Ok(one_body(bra, ket, space, Channel::Both))
}

pub fn make_rdm1s(civec: &DMatrix<f64>, space: &FciSpace) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
    trans_rdm1s(civec, civec, space)
}

pub fn make_rdm1(civec: &DMatrix<f64>, space: &FciSpace) -> Result<DMatrix<f64>> {
    trans_rdm1(civec, civec, space)
}

/// Spin-summed 1-RDM and the raw 2-RDM `dm2[p,q,r,s] = <bra|E_pq E_rs|ket>`.
///
/// The 2-RDM comes from one dense product over the determinant index:
/// `<bra|E_pq E_rs|ket> = Σ_K <K|E_qp|bra> <K|E_rs|ket>`.
/// Pass it through [`reorder_rdm`] for `<p+ r+ s q>`.
pub fn trans_rdm12(
    bra: &DMatrix<f64>,
    ket: &DMatrix<f64>,
    space: &FciSpace,
) -> Result<(DMatrix<f64>, Rdm2)> {
    check_pair(bra, ket, space)?;
    let norb = space.norb();
    let t_ket = excitation_vectors(ket, space, Channel::Both);
    let t_bra = excitation_vectors(bra, space, Channel::Both);

    let flat1 = &t_ket * space.flatten(bra);
    let dm1 = DMatrix::from_fn(norb, norb, |p, q| flat1[p * norb + q]);

    let product = t_bra * t_ket.transpose();
    let mut dm2 = Rdm2::zeros(norb);
    for p in 0..norb {
        for q in 0..norb {
            for r in 0..norb {
                for s in 0..norb {
                    dm2[(p, q, r, s)] = product[(q * norb + p, r * norb + s)];
                }
            }
        }
    }
    Ok((dm1, dm2))
}

pub fn make_rdm12(civec: &DMatrix<f64>, space: &FciSpace) -> Result<(DMatrix<f64>, Rdm2)> {
    trans_rdm12(civec, civec, space)
}

/// `<p+ q r+ s>` to normal order `<p+ r+ s q>` by removing `δ_qr <p+ s>`.
pub fn reorder_rdm(dm1: &DMatrix<f64>, dm2: &Rdm2) -> Result<(DMatrix<f64>, Rdm2)> {
    let norb = dm2.norb();
    if dm1.nrows() != norb || dm1.ncols() != norb {
        return Err(FciError::shape(
            "dm1",
            format!("{norb}x{norb}"),
            format!("{}x{}", dm1.nrows(), dm1.ncols()),
        ));
    }
    let mut reordered = dm2.clone();
    for k in 0..norb {
        for p in 0..norb {
            for s in 0..norb {
                reordered[(p, k, k, s)] -= dm1[(p, s)];
            }
        }
    }
    Ok((dm1.clone(), reordered))
}
