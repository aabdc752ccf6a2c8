use std::fmt;

use crate::DataError;

/// Errors produced by ML plugins when inputs are invalid.
#[derive(Debug, Clone, PartialEq)]
pub enum MlError {
    /// An input is invalid for semantic or domain reasons.
    InvalidInput(&'static str),

    /// A shape invariant was violated (e.g. mismatched lengths).
    ShapeMismatch {
        /// Human-readable context for the mismatch (e.g. "params", "batch").
        what: &'static str,
        /// Observed value.
        got: usize,
        /// Expected value.
        expected: usize,
    },

    /// A computation produced a NaN or an infinity.
    NonFinite { what: &'static str },
}

impl fmt::Display for MlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            MlError::ShapeMismatch { what, got, expected } => {
                write!(f, "shape mismatch for {what}: got {got}, expected {expected}")
            }
            MlError::NonFinite { what } => write!(f, "non-finite value in {what}"),
        }
    }
}

impl std::error::Error for MlError {}

/// Errors a selection strategy reports instead of a subset.
///
/// The controller never recovers from these: a strategy that cannot produce
/// `budget` valid entries terminates the run.
#[derive(Debug)]
pub enum SelectionError {
    /// The requested budget is larger than the pool the strategy draws from.
    BudgetExceedsPool { budget: usize, pool: usize },

    /// The budget must be strictly positive.
    EmptyBudget,

    /// The strategy returned the wrong amount of entries.
    WrongSize { got: usize, expected: usize },

    /// Indices and weights do not line up.
    LengthMismatch { indices: usize, gammas: usize },

    /// A selected index does not belong to `[0, len)`.
    IndexOutOfBounds { index: usize, len: usize },

    /// A weight is zero, negative or not finite.
    InvalidWeight { position: usize, value: f32 },

    /// The strategy's inner optimization gave up.
    Optimization(String),

    /// The strategy's private model failed.
    Model(MlError),

    /// The strategy could not read the dataset.
    Data(DataError),
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BudgetExceedsPool { budget, pool } => {
                write!(f, "budget {budget} exceeds the candidate pool of {pool}")
            }
            Self::EmptyBudget => write!(f, "budget must be greater than 0"),
            Self::WrongSize { got, expected } => {
                write!(f, "selection has {got} entries, expected {expected}")
            }
            Self::LengthMismatch { indices, gammas } => {
                write!(f, "{indices} indices but {gammas} weights")
            }
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "selected index {index} is out of bounds for {len} samples")
            }
            Self::InvalidWeight { position, value } => {
                write!(f, "weight at position {position} is not positive and finite: {value}")
            }
            Self::Optimization(msg) => write!(f, "selection optimization failed: {msg}"),
            Self::Model(e) => write!(f, "model error during selection: {e}"),
            Self::Data(e) => write!(f, "data error during selection: {e}"),
        }
    }
}

impl std::error::Error for SelectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Model(e) => Some(e),
            Self::Data(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MlError> for SelectionError {
    fn from(value: MlError) -> Self {
        Self::Model(value)
    }
}

impl From<DataError> for SelectionError {
    fn from(value: DataError) -> Self {
        Self::Data(value)
    }
}
