//! Integrals from a parsed job file

use crate::config::Config;
use crate::integrals::Integrals;
use crate::tensor::Eri;
use color_eyre::eyre::{eyre, Result, WrapErr};
use nalgebra::DMatrix;

fn one_body(what: &str, rows: &[Vec<f64>], norb: usize) -> Result<DMatrix<f64>> {
    if rows.len() != norb || rows.iter().any(|row| row.len() != norb) {
        return Err(eyre!("{what} must be a {norb}x{norb} matrix"));
    }
    Ok(DMatrix::from_fn(norb, norb, |p, q| rows[p][q]))
}

fn two_body(what: &str, values: &[f64], norb: usize) -> Result<Eri> {
    Eri::from_full(norb, values).wrap_err_with(|| format!("Invalid {what} block"))
}

/// Build restricted or unrestricted integrals from the job's blocks.
///
/// Any of `h1e_b`, `eri_ab`, `eri_bb` makes the integrals unrestricted;
/// missing beta blocks fall back to their alpha counterparts.
pub fn load_integrals(config: &Config) -> Result<Integrals> {
    let norb = config.norb;
    let h1e = one_body("h1e", &config.h1e, norb)?;
    let eri = two_body("eri", &config.eri, norb)?;

    if !config.is_unrestricted() {
        return Integrals::restricted(h1e, eri).wrap_err("Inconsistent integrals");
    }

    let h1e_b = match &config.h1e_b {
        Some(rows) => one_body("h1e_b", rows, norb)?,
        None => h1e.clone(),
    };
    let eri_ab = match &config.eri_ab {
        Some(values) => two_body("eri_ab", values, norb)?,
        None => eri.clone(),
    };
    let eri_bb = match &config.eri_bb {
        Some(values) => two_body("eri_bb", values, norb)?,
        None => eri.clone(),
    };
    Integrals::unrestricted(h1e, h1e_b, eri, eri_ab, eri_bb).wrap_err("Inconsistent integrals")
}
