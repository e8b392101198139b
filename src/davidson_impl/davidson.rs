//! Block Davidson iterations for the lowest eigenpairs of a symmetric operator

use crate::error::{FciError, Result};
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Correction-vector builder. `precondition(r, e0, x0)` approximates
/// `(H - e0)^-1 r` for the residual `r` of the Ritz pair `(e0, x0)`.
pub trait Preconditioner: Sync {
    fn precondition(&self, residual: &DVector<f64>, e0: f64, x0: &DVector<f64>) -> DVector<f64>;
}

impl<F> Preconditioner for F
where
    F: Fn(&DVector<f64>, f64, &DVector<f64>) -> DVector<f64> + Sync,
{
    fn precondition(&self, residual: &DVector<f64>, e0: f64, x0: &DVector<f64>) -> DVector<f64> {
        self(residual, e0, x0)
    }
}

#[derive(Debug, Clone)]
pub struct DavidsonOptions {
    pub conv_tol: f64,
    /// Defaults to `sqrt(conv_tol)` when unset.
    pub residual_tol: Option<f64>,
    pub lindep: f64,
    pub max_cycle: usize,
    pub max_space: usize,
    /// Megabytes available for subspace and sigma vectors.
    pub max_memory: f64,
    pub nroots: usize,
}

impl Default for DavidsonOptions {
    fn default() -> Self {
        DavidsonOptions {
            conv_tol: 1e-10,
            residual_tol: None,
            lindep: 1e-14,
            max_cycle: 100,
            max_space: 12,
            max_memory: 2000.0,
            nroots: 1,
        }
    }
}

impl DavidsonOptions {
    pub fn residual_tol(&self) -> f64 {
        self.residual_tol.unwrap_or_else(|| self.conv_tol.sqrt())
    }

    /// Largest subspace that fits `max_space` and `max_memory`, never below
    /// what `nroots` needs nor above the problem dimension.
    fn space_limit(&self, dim: usize, nroots: usize) -> usize {
        let bytes_per_vector = (2 * dim * std::mem::size_of::<f64>()).max(1) as f64;
        let by_memory = (self.max_memory * 1024.0 * 1024.0 / bytes_per_vector) as usize;
        self.max_space
            .min(by_memory)
            .max(2 * nroots)
            .min(dim)
            .max(nroots)
    }
}

/// Lowest-root energy and residual norm of one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationRecord {
    pub energy: f64,
    pub residual: f64,
}

#[derive(Debug, Clone)]
pub struct DavidsonResult {
    pub energies: Vec<f64>,
    pub vectors: Vec<DVector<f64>>,
    pub converged: bool,
    pub iterations: usize,
    pub history: Vec<IterationRecord>,
}

/// Symmetric eigendecomposition with eigenvalues ascending and eigenvectors
/// in matching column order.
pub fn eigh_sorted(matrix: DMatrix<f64>) -> (DVector<f64>, DMatrix<f64>) {
    let eig = SymmetricEigen::new(matrix);
    let mut indices: Vec<usize> = (0..eig.eigenvalues.len()).collect();
    indices.sort_by(|&a, &b| {
        eig.eigenvalues[a]
            .partial_cmp(&eig.eigenvalues[b])
            .unwrap_or(Ordering::Equal)
    });
    let values = DVector::from_fn(indices.len(), |i, _| eig.eigenvalues[indices[i]]);
    let vectors = eig.eigenvectors.select_columns(indices.iter());
    (values, vectors)
}

/// Normalise `v`, orthogonalise it against `basis` twice and normalise again.
/// Returns `None` when the part outside the span is below `lindep`.
fn orthonormalize(
    v: DVector<f64>,
    basis: &[DVector<f64>],
    extra: &[DVector<f64>],
    lindep: f64,
) -> Option<DVector<f64>> {
    let initial = v.norm();
    if !(initial > 0.0) || !initial.is_finite() {
        return None;
    }
    let mut v = v / initial;
    for _ in 0..2 {
        for b in basis.iter().chain(extra.iter()) {
            let overlap = b.dot(&v);
            v.axpy(-overlap, b, 1.0);
        }
    }
    let norm = v.norm();
    if norm < lindep || !norm.is_finite() {
        None
    } else {
        Some(v / norm)
    }
}

fn combine(vectors: &[DVector<f64>], coefficients: &DMatrix<f64>, column: usize) -> DVector<f64> {
    let mut out = DVector::zeros(vectors[0].len());
    for (j, v) in vectors.iter().enumerate() {
        out.axpy(coefficients[(j, column)], v, 1.0);
    }
    out
}

/// Lowest `options.nroots` eigenpairs of the symmetric operator `op`.
///
/// `guesses` seed the subspace; they are orthonormalised and linearly
/// dependent ones are dropped. Running out of `max_cycle` is not an error:
/// the current Ritz pairs come back with `converged = false`.
pub fn davidson<Op, P>(
    op: Op,
    guesses: &[DVector<f64>],
    precond: &P,
    options: &DavidsonOptions,
) -> Result<DavidsonResult>
where
    Op: Fn(&DVector<f64>) -> Result<DVector<f64>>,
    P: Preconditioner + ?Sized,
{
    let dim = guesses
        .first()
        .map(|g| g.len())
        .ok_or_else(|| FciError::InvalidConfiguration("Davidson needs an initial guess".to_string()))?;
    if dim == 0 || guesses.iter().any(|g| g.len() != dim) {
        return Err(FciError::InvalidConfiguration(
            "initial guesses must share a non-zero dimension".to_string(),
        ));
    }
    if options.nroots == 0 {
        return Err(FciError::InvalidConfiguration(
            "nroots must be at least 1".to_string(),
        ));
    }

    let nroots = options.nroots.min(dim);
    let space_limit = options.space_limit(dim, nroots);
    let residual_tol = options.residual_tol();

    let mut basis: Vec<DVector<f64>> = Vec::with_capacity(space_limit);
    for guess in guesses {
        match orthonormalize(guess.clone(), &basis, &[], options.lindep) {
            Some(v) => basis.push(v),
            None => debug!("Dropping linearly dependent initial guess"),
        }
    }
    if basis.is_empty() {
        return Err(FciError::Linalg(
            "initial guesses are linearly dependent or zero".to_string(),
        ));
    }
    basis.truncate(space_limit);

    let mut sigmas: Vec<DVector<f64>> = Vec::with_capacity(space_limit);
    let mut previous = vec![f64::INFINITY; nroots];
    let mut history = Vec::new();
    let mut converged = false;
    let mut iterations = 0;
    let mut energies = Vec::new();
    let mut ritz_vectors: Vec<DVector<f64>> = Vec::new();

    debug!(
        "Davidson: dim {}, nroots {}, subspace limit {}, conv_tol {:.1e}, residual_tol {:.1e}",
        dim, nroots, space_limit, options.conv_tol, residual_tol
    );

    while iterations < options.max_cycle {
        iterations += 1;

        for v in &basis[sigmas.len()..] {
            sigmas.push(op(v)?);
        }

        let m = basis.len();
        let mut heff = DMatrix::zeros(m, m);
        for i in 0..m {
            for j in 0..=i {
                let hij = 0.5 * (basis[i].dot(&sigmas[j]) + basis[j].dot(&sigmas[i]));
                heff[(i, j)] = hij;
                heff[(j, i)] = hij;
            }
        }
        let (w, v) = eigh_sorted(heff);
        let nroots_now = nroots.min(m);

        ritz_vectors = (0..nroots_now).map(|k| combine(&basis, &v, k)).collect();
        let ritz_sigmas: Vec<DVector<f64>> =
            (0..nroots_now).map(|k| combine(&sigmas, &v, k)).collect();
        let residuals: Vec<DVector<f64>> = (0..nroots_now)
            .map(|k| &ritz_sigmas[k] - &ritz_vectors[k] * w[k])
            .collect();
        let norms: Vec<f64> = residuals.iter().map(|r| r.norm()).collect();
        energies = w.iter().take(nroots_now).copied().collect();

        let root_converged: Vec<bool> = (0..nroots_now)
            .map(|k| (w[k] - previous[k]).abs() < options.conv_tol && norms[k] < residual_tol)
            .collect();
        for k in 0..nroots_now {
            debug!(
                "  cycle {:3} root {} E = {:.12} dE = {:.3e} |r| = {:.3e}",
                iterations,
                k,
                w[k],
                w[k] - previous[k],
                norms[k]
            );
            previous[k] = w[k];
        }
        history.push(IterationRecord {
            energy: w[0],
            residual: norms[0],
        });

        if nroots_now == nroots && root_converged.iter().all(|&c| c) {
            converged = true;
            break;
        }
        if iterations == options.max_cycle {
            break;
        }

        let mut fresh: Vec<DVector<f64>> = Vec::new();
        for k in 0..nroots_now {
            if root_converged[k] {
                continue;
            }
            let t = precond.precondition(&residuals[k], w[k], &ritz_vectors[k]);
            match orthonormalize(t, &basis, &fresh, options.lindep) {
                Some(t) => fresh.push(t),
                None => debug!("  root {}: correction vector linearly dependent, dropped", k),
            }
        }
        if fresh.is_empty() {
            debug!("Davidson subspace exhausted after {} cycles", iterations);
            converged = norms.iter().all(|&r| r < residual_tol) && nroots_now == nroots;
            break;
        }

        if basis.len() + fresh.len() > space_limit {
            debug!("  collapsing subspace of {} onto {} Ritz vectors", basis.len(), nroots_now);
            basis = ritz_vectors.clone();
            sigmas = ritz_sigmas;
        }
        let room = space_limit.saturating_sub(basis.len()).max(1);
        basis.extend(fresh.into_iter().take(room));
    }

    if !converged {
        warn!(
            "Davidson did not converge in {} cycles (|r| = {:.3e})",
            iterations,
            history.last().map(|h| h.residual).unwrap_or(f64::NAN)
        );
    }

    Ok(DavidsonResult {
        energies,
        vectors: ritz_vectors,
        converged,
        iterations,
        history,
    })
}
