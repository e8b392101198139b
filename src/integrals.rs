//! Active-space integrals handed to the FCI core by the integral layer

use crate::error::{FciError, Result};
use crate::tensor::Eri;
use nalgebra::DMatrix;

/// One- and two-electron integrals over the active orbitals.
///
/// Restricted integrals share one set of orbitals for both spins.
/// Unrestricted integrals carry separate alpha and beta one-electron
/// matrices and the `(aa|aa)`, `(aa|bb)`, `(bb|bb)` two-electron blocks.
#[derive(Debug, Clone)]
pub enum Integrals {
    Restricted {
        h1e: DMatrix<f64>,
        eri: Eri,
    },
    Unrestricted {
        h1e: [DMatrix<f64>; 2],
        eri: [Eri; 3],
    },
}

fn check_square(what: &'static str, h: &DMatrix<f64>, norb: usize) -> Result<()> {
    if h.nrows() != norb || h.ncols() != norb {
        return Err(FciError::shape(
            what,
            format!("{norb}x{norb}"),
            format!("{}x{}", h.nrows(), h.ncols()),
        ));
    }
    Ok(())
}

fn check_eri(what: &'static str, eri: &Eri, norb: usize) -> Result<()> {
    if eri.norb() != norb {
        return Err(FciError::shape(what, norb, eri.norb()));
    }
    Ok(())
}

impl Integrals {
    pub fn restricted(h1e: DMatrix<f64>, eri: Eri) -> Result<Self> {
        let norb = eri.norb();
        check_square("h1e", &h1e, norb)?;
        Ok(Integrals::Restricted { h1e, eri })
    }

    pub fn unrestricted(
        h1e_a: DMatrix<f64>,
        h1e_b: DMatrix<f64>,
        eri_aa: Eri,
        eri_ab: Eri,
        eri_bb: Eri,
    ) -> Result<Self> {
        let norb = eri_aa.norb();
        check_square("h1e (alpha)", &h1e_a, norb)?;
        check_square("h1e (beta)", &h1e_b, norb)?;
        check_eri("eri (alpha-beta)", &eri_ab, norb)?;
        check_eri("eri (beta-beta)", &eri_bb, norb)?;
        Ok(Integrals::Unrestricted {
            h1e: [h1e_a, h1e_b],
            eri: [eri_aa, eri_ab, eri_bb],
        })
    }

    pub fn norb(&self) -> usize {
        match self {
            Integrals::Restricted { eri, .. } => eri.norb(),
            Integrals::Unrestricted { eri, .. } => eri[0].norb(),
        }
    }

    pub fn is_restricted(&self) -> bool {
        matches!(self, Integrals::Restricted { .. })
    }

    pub fn h1e_alpha(&self) -> &DMatrix<f64> {
        match self {
            Integrals::Restricted { h1e, .. } => h1e,
            Integrals::Unrestricted { h1e, .. } => &h1e[0],
        }
    }

    pub fn h1e_beta(&self) -> &DMatrix<f64> {
        match self {
            Integrals::Restricted { h1e, .. } => h1e,
            Integrals::Unrestricted { h1e, .. } => &h1e[1],
        }
    }

    pub fn eri_aa(&self) -> &Eri {
        match self {
            Integrals::Restricted { eri, .. } => eri,
            Integrals::Unrestricted { eri, .. } => &eri[0],
        }
    }

    /// `(pq|rs)` with `pq` alpha and `rs` beta.
    pub fn eri_ab(&self) -> &Eri {
        match self {
            Integrals::Restricted { eri, .. } => eri,
            Integrals::Unrestricted { eri, .. } => &eri[1],
        }
    }

    pub fn eri_bb(&self) -> &Eri {
        match self {
            Integrals::Restricted { eri, .. } => eri,
            Integrals::Unrestricted { eri, .. } => &eri[2],
        }
    }

    pub fn check_norb(&self, norb: usize) -> Result<()> {
        if self.norb() != norb {
            return Err(FciError::shape("integrals (norb)", norb, self.norb()));
        }
        Ok(())
    }

    /// Promote restricted integrals to the unrestricted layout.
    pub fn to_unrestricted(&self) -> Self {
        match self {
            Integrals::Restricted { h1e, eri } => Integrals::Unrestricted {
                h1e: [h1e.clone(), h1e.clone()],
                eri: [eri.clone(), eri.clone(), eri.clone()],
            },
            unrestricted => unrestricted.clone(),
        }
    }
}
