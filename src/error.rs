//! Error types shared by the FCI kernels

use thiserror::Error;

/// Errors raised by the string, contraction, RDM and solver layers.
///
/// Non-convergence of the Davidson iteration is not an error; it is
/// reported through the `converged` flag of the solver result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FciError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("shape mismatch for {what}: expected {expected}, got {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: String,
        found: String,
    },

    #[error("incompatible integrals: {0}")]
    IncompatibleIntegrals(String),

    #[error("linear algebra failure: {0}")]
    Linalg(String),
}

impl FciError {
    pub(crate) fn shape(what: &'static str, expected: impl ToString, found: impl ToString) -> Self {
        FciError::ShapeMismatch {
            what,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FciError>;
