//! Errors raised by the solvers and the IRL trainer.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug)]
pub enum Error {
    /// A row of the transition table does not sum to one.
    #[error("invalid transition model: T({state}, {action}, .) sums to {sum}")]
    InvalidTransitionModel {
        /// Originating state of the offending row.
        state: usize,
        /// Action of the offending row.
        action: usize,
        /// Actual sum of the row.
        sum: f64,
    },

    /// Array shapes or indices are inconsistent across components.
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// What was being checked.
        context: String,
        /// The expected size (or exclusive upper bound for an index).
        expected: usize,
        /// The size or index actually seen.
        actual: usize,
    },

    /// A non-finite value survived the stabilized computations.
    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    /// The normal matrix of a least-squares problem is singular.
    #[error("feature matrix is rank deficient")]
    RankDeficient,

    /// The dataset contains no transition records.
    #[error("dataset contains no transitions")]
    EmptyDataset,

    /// A parameter is outside of its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// I/O error while reading or writing a configuration.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML (de)serialization error.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn dimension(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Error::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
