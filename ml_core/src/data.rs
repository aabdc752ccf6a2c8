use std::fmt;

use ndarray::Array2;

/// Errors produced while accessing dataset samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    /// The requested sample index is out of bounds.
    OutOfBounds { index: usize, len: usize },

    /// The dataset could not provide a valid sample due to domain constraints.
    InvalidSample(&'static str),
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::OutOfBounds { index, len } => {
                write!(f, "sample index {index} is out of bounds for {len} samples")
            }
            DataError::InvalidSample(msg) => write!(f, "invalid sample: {msg}"),
        }
    }
}

impl std::error::Error for DataError {}

/// An owned batch of examples, one row per example.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub x: Array2<f32>,
    pub y: Array2<f32>,
}

impl Batch {
    #[inline]
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }
}

/// An indexable, length-known collection of `(input, label)` pairs.
///
/// A `Dataset` is responsible only for *providing access* to samples. It does
/// not decide how they are ordered, batched or weighted; batching views are
/// built on top of `gather` from arbitrary index subsets.
pub trait Dataset: Send + Sync {
    /// Returns the total number of samples.
    fn len(&self) -> usize;

    /// Returns `true` if the dataset holds no samples.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the width of an input row.
    fn x_size(&self) -> usize;

    /// Returns the width of a target row.
    fn y_size(&self) -> usize;

    /// Returns the number of distinct classes used by `class_of`.
    fn num_classes(&self) -> usize;

    /// Copies the rows at `indices`, in that order, into a new batch.
    ///
    /// # Errors
    /// Returns `DataError::OutOfBounds` if any index is invalid.
    fn gather(&self, indices: &[usize]) -> Result<Batch, DataError>;

    /// Returns the class of the sample at `index`.
    ///
    /// # Errors
    /// Returns `DataError::OutOfBounds` if `index` is invalid.
    fn class_of(&self, index: usize) -> Result<usize, DataError>;
}
