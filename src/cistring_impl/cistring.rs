//! Occupation strings, their canonical addresses and single-excitation linkage

use crate::error::{FciError, Result};
use crate::tensor::pair_index;
use itertools::Itertools;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Strings are `u64` bit masks, bit `p` set when orbital `p` is occupied.
pub const MAX_ORBITALS: usize = 64;

/// Number of alpha and beta electrons in the active space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nelec {
    pub alpha: usize,
    pub beta: usize,
}

impl Nelec {
    pub fn new(alpha: usize, beta: usize) -> Self {
        Nelec { alpha, beta }
    }

    /// Split a total electron count, putting the odd electron into alpha.
    pub fn from_total(total: usize) -> Self {
        let beta = total / 2;
        Nelec {
            alpha: total - beta,
            beta,
        }
    }

    pub fn total(&self) -> usize {
        self.alpha + self.beta
    }

    pub fn is_ms0(&self) -> bool {
        self.alpha == self.beta
    }
}

impl From<(usize, usize)> for Nelec {
    fn from((alpha, beta): (usize, usize)) -> Self {
        Nelec::new(alpha, beta)
    }
}

impl From<usize> for Nelec {
    fn from(total: usize) -> Self {
        Nelec::from_total(total)
    }
}

impl fmt::Display for Nelec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}a, {}b)", self.alpha, self.beta)
    }
}

/// Binomial coefficient, 0 when `k > n`. Saturates instead of overflowing.
fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        acc = acc * (n - i) as u128 / (i + 1) as u128;
        if acc > usize::MAX as u128 {
            return usize::MAX;
        }
    }
    acc as usize
}

fn check_space(norb: usize, nelec: usize) -> Result<()> {
    if norb == 0 {
        return Err(FciError::InvalidConfiguration(
            "number of orbitals must be positive".to_string(),
        ));
    }
    if norb > MAX_ORBITALS {
        return Err(FciError::InvalidConfiguration(format!(
            "{norb} orbitals exceed the {MAX_ORBITALS}-orbital string limit"
        )));
    }
    if nelec > norb {
        return Err(FciError::InvalidConfiguration(format!(
            "{nelec} electrons cannot occupy {norb} orbitals"
        )));
    }
    Ok(())
}

/// Number of strings `C(norb, nelec)`.
pub fn num_strings(norb: usize, nelec: usize) -> Result<usize> {
    check_space(norb, nelec)?;
    let n = binomial(norb, nelec);
    if n == usize::MAX {
        return Err(FciError::InvalidConfiguration(format!(
            "C({norb}, {nelec}) does not fit in memory addressing"
        )));
    }
    Ok(n)
}

/// All strings of `nelec` electrons in `norb` orbitals, in address order.
pub fn make_strings(norb: usize, nelec: usize) -> Result<Vec<u64>> {
    let count = num_strings(norb, nelec)?;
    let mut strings: Vec<u64> = (0..norb)
        .combinations(nelec)
        .map(|occ| occ.iter().fold(0u64, |s, &p| s | (1u64 << p)))
        .collect();
    strings.sort_unstable();
    debug_assert_eq!(strings.len(), count);
    Ok(strings)
}

fn str2addr_unchecked(norb: usize, nelec: usize, string: u64) -> usize {
    let mut addr = 0;
    let mut nelec_left = nelec;
    for norb_left in (0..norb).rev() {
        if nelec_left == 0 || norb_left < nelec_left {
            break;
        }
        if string & (1u64 << norb_left) != 0 {
            addr += binomial(norb_left, nelec_left);
            nelec_left -= 1;
        }
    }
    addr
}

/// Address of `string` in the canonical ordering.
pub fn str2addr(norb: usize, nelec: usize, string: u64) -> Result<usize> {
    check_space(norb, nelec)?;
    let outside = if norb == MAX_ORBITALS {
        0
    } else {
        string >> norb
    };
    if outside != 0 || string.count_ones() as usize != nelec {
        return Err(FciError::InvalidConfiguration(format!(
            "string {string:#b} is not a {nelec}-electron string over {norb} orbitals"
        )));
    }
    Ok(str2addr_unchecked(norb, nelec, string))
}

/// Inverse of [`str2addr`].
pub fn addr2str(norb: usize, nelec: usize, addr: usize) -> Result<u64> {
    let count = num_strings(norb, nelec)?;
    if addr >= count {
        return Err(FciError::InvalidConfiguration(format!(
            "address {addr} out of range for {count} strings"
        )));
    }
    let mut addr = addr;
    let mut string = 0u64;
    let mut nelec_left = nelec;
    for norb_left in (0..norb).rev() {
        if nelec_left == 0 {
            break;
        }
        let c = binomial(norb_left, nelec_left);
        if addr >= c {
            string |= 1u64 << norb_left;
            addr -= c;
            nelec_left -= 1;
        }
    }
    Ok(string)
}

/// Fermionic sign of `a+_p a_q` acting on `string`.
///
/// Returns 0 when the excitation is forbidden (`q` empty or `p` already
/// occupied), otherwise the parity of the occupied orbitals strictly between
/// `p` and `q`.
pub fn cre_des_sign(p: usize, q: usize, string: u64) -> i8 {
    if p == q {
        return if string & (1u64 << q) != 0 { 1 } else { 0 };
    }
    if string & (1u64 << p) != 0 || string & (1u64 << q) == 0 {
        return 0;
    }
    let (lo, hi) = if p > q { (q, p) } else { (p, q) };
    // bits lo+1 .. hi-1
    let mask = ((1u64 << hi) - 1) & !((1u64 << (lo + 1)) - 1);
    if (string & mask).count_ones() % 2 == 0 {
        1
    } else {
        -1
    }
}

/// Occupied orbitals of `string`, increasing.
pub fn occupied_orbitals(string: u64) -> Vec<usize> {
    (0..MAX_ORBITALS)
        .filter(|&p| string & (1u64 << p) != 0)
        .collect()
}

/// One single-excitation connection `E_{create,annihilate} |origin> = sign |address>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkEntry {
    pub create: u8,
    pub annihilate: u8,
    pub sign: i8,
    /// packed lower-triangular index of the orbital pair
    pub pair: u16,
    pub address: usize,
}

impl LinkEntry {
    #[inline]
    pub fn create(&self) -> usize {
        self.create as usize
    }

    #[inline]
    pub fn annihilate(&self) -> usize {
        self.annihilate as usize
    }

    #[inline]
    pub fn pair_index(&self) -> usize {
        self.pair as usize
    }

    #[inline]
    pub fn signf(&self) -> f64 {
        self.sign as f64
    }
}

/// Linkage table for all strings of `nelec` electrons in `norb` orbitals.
///
/// Entries for string `s` start with the `nelec` diagonal entries `(i, i)` in
/// increasing orbital order, followed by every `(a, i)` with `i` occupied and
/// `a` empty.
#[derive(Debug, Clone)]
pub struct LinkTable {
    norb: usize,
    nelec: usize,
    nlink: usize,
    strings: Vec<u64>,
    entries: Vec<LinkEntry>,
}

impl LinkTable {
    pub fn new(norb: usize, nelec: usize) -> Result<Self> {
        let strings = make_strings(norb, nelec)?;
        let nlink = nelec + nelec * (norb - nelec);

        let rows: Vec<Vec<LinkEntry>> = strings
            .par_iter()
            .map(|&string| {
                let mut row = Vec::with_capacity(nlink);
                let occ: Vec<usize> = (0..norb).filter(|&p| string & (1u64 << p) != 0).collect();
                let vir: Vec<usize> = (0..norb).filter(|&p| string & (1u64 << p) == 0).collect();
                let self_addr = str2addr_unchecked(norb, nelec, string);

                for &i in &occ {
                    row.push(LinkEntry {
                        create: i as u8,
                        annihilate: i as u8,
                        sign: 1,
                        pair: pair_index(i, i) as u16,
                        address: self_addr,
                    });
                }
                for &i in &occ {
                    for &a in &vir {
                        let target = (string ^ (1u64 << i)) | (1u64 << a);
                        row.push(LinkEntry {
                            create: a as u8,
                            annihilate: i as u8,
                            sign: cre_des_sign(a, i, string),
                            pair: pair_index(a, i) as u16,
                            address: str2addr_unchecked(norb, nelec, target),
                        });
                    }
                }
                row
            })
            .collect();

        let entries: Vec<LinkEntry> = rows.into_iter().flatten().collect();
        debug!(
            "Linkage table for {} electrons in {} orbitals: {} strings x {} links",
            nelec,
            norb,
            strings.len(),
            nlink
        );

        Ok(LinkTable {
            norb,
            nelec,
            nlink,
            strings,
            entries,
        })
    }

    pub fn norb(&self) -> usize {
        self.norb
    }

    pub fn nelec(&self) -> usize {
        self.nelec
    }

    pub fn num_strings(&self) -> usize {
        self.strings.len()
    }

    pub fn num_links(&self) -> usize {
        self.nlink
    }

    pub fn strings(&self) -> &[u64] {
        &self.strings
    }

    #[inline]
    pub fn string(&self, addr: usize) -> u64 {
        self.strings[addr]
    }

    #[inline]
    pub fn links(&self, addr: usize) -> &[LinkEntry] {
        &self.entries[addr * self.nlink..(addr + 1) * self.nlink]
    }

    /// Occupied orbitals of string `addr`, read off the diagonal entries.
    pub fn occupations(&self, addr: usize) -> impl Iterator<Item = usize> + '_ {
        self.links(addr)[..self.nelec]
            .iter()
            .map(|entry| entry.annihilate())
    }
}

/// The determinant space of an FCI problem: orbitals, electrons and the two
/// linkage tables. Cheap to clone; the tables are shared read-only.
#[derive(Debug, Clone)]
pub struct FciSpace {
    norb: usize,
    nelec: Nelec,
    links_a: Arc<LinkTable>,
    links_b: Arc<LinkTable>,
}

impl FciSpace {
    pub fn new(norb: usize, nelec: impl Into<Nelec>) -> Result<Self> {
        let nelec = nelec.into();
        check_space(norb, nelec.alpha)?;
        check_space(norb, nelec.beta)?;

        let links_a = Arc::new(LinkTable::new(norb, nelec.alpha)?);
        let links_b = if nelec.is_ms0() {
            Arc::clone(&links_a)
        } else {
            Arc::new(LinkTable::new(norb, nelec.beta)?)
        };

        Ok(FciSpace {
            norb,
            nelec,
            links_a,
            links_b,
        })
    }

    pub fn norb(&self) -> usize {
        self.norb
    }

    pub fn nelec(&self) -> Nelec {
        self.nelec
    }

    pub fn na(&self) -> usize {
        self.links_a.num_strings()
    }

    pub fn nb(&self) -> usize {
        self.links_b.num_strings()
    }

    pub fn ndet(&self) -> usize {
        self.na() * self.nb()
    }

    pub fn links_a(&self) -> &LinkTable {
        &self.links_a
    }

    pub fn links_b(&self) -> &LinkTable {
        &self.links_b
    }

    /// Whether alpha and beta share a single linkage table (MS=0 spaces).
    pub fn shares_links(&self) -> bool {
        Arc::ptr_eq(&self.links_a, &self.links_b)
    }

    pub fn check_civec(&self, civec: &DMatrix<f64>) -> Result<()> {
        if civec.nrows() != self.na() || civec.ncols() != self.nb() {
            return Err(FciError::shape(
                "CI vector",
                format!("{}x{}", self.na(), self.nb()),
                format!("{}x{}", civec.nrows(), civec.ncols()),
            ));
        }
        Ok(())
    }

    pub fn check_one_body(&self, what: &'static str, h: &DMatrix<f64>) -> Result<()> {
        if h.nrows() != self.norb || h.ncols() != self.norb {
            return Err(FciError::shape(
                what,
                format!("{0}x{0}", self.norb),
                format!("{}x{}", h.nrows(), h.ncols()),
            ));
        }
        Ok(())
    }

    /// Flat determinant index `ia * nb + ib`.
    #[inline]
    pub fn det_index(&self, ia: usize, ib: usize) -> usize {
        ia * self.nb() + ib
    }

    /// CI matrix to a vector in determinant order.
    pub fn flatten(&self, civec: &DMatrix<f64>) -> DVector<f64> {
        let nb = self.nb();
        DVector::from_fn(self.ndet(), |k, _| civec[(k / nb, k % nb)])
    }

    /// Inverse of [`FciSpace::flatten`].
    pub fn unflatten(&self, flat: &DVector<f64>) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.na(), self.nb(), flat.as_slice())
    }
}
