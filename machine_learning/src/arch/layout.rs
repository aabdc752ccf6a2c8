use std::ops::Range;

use crate::{Result, error::MlError};

/// Maps a flat parameter buffer into one contiguous slice per layer.
/// This is the core "offsets + sizes" mechanism behind `Sequential`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterLayout {
    ranges: Vec<Range<usize>>,
    total: usize,
}

impl ParameterLayout {
    /// Lays the given sizes one after the other, in order.
    pub fn from_sizes<I>(sizes: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut total = 0;
        let ranges = sizes
            .into_iter()
            .map(|size| {
                let range = total..total + size;
                total += size;
                range
            })
            .collect();

        Self { ranges, total }
    }

    /// The total amount of parameters covered by this layout.
    pub fn total(&self) -> usize {
        self.total
    }

    /// The slice of the `i`-th layer, if any.
    pub fn range(&self, i: usize) -> Option<Range<usize>> {
        self.ranges.get(i).cloned()
    }

    pub fn ranges(&self) -> std::slice::Iter<'_, Range<usize>> {
        self.ranges.iter()
    }

    /// Sanity check: ranges must be in-bounds and non-overlapping for a given buffer size.
    pub fn validate(&self, total_params: usize) -> Result<()> {
        if self.total != total_params {
            return Err(MlError::ShapeMismatch {
                what: "parameter layout",
                got: total_params,
                expected: self.total,
            });
        }

        let overlapping = self
            .ranges
            .windows(2)
            .any(|pair| pair[0].end > pair[1].start);

        if overlapping {
            return Err(MlError::InvalidInput("parameter layout ranges overlap"));
        }

        Ok(())
    }
}
