use crate::SelectionError;

/// The outcome of a selection round: which samples to train on and how much
/// each of them counts.
///
/// Built only through `Selection::new`, which checks every invariant the
/// trainer relies on, so a `Selection` in hand is always well formed.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    indices: Vec<usize>,
    gammas: Vec<f32>,
}

impl Selection {
    /// Validates and wraps a strategy's output.
    ///
    /// # Args
    /// * `indices` - Selected dataset indices.
    /// * `gammas` - One weight per index, same order.
    /// * `budget` - Expected amount of entries.
    /// * `len` - Size of the dataset the indices point into.
    ///
    /// # Errors
    /// Returns a `SelectionError` if the sizes disagree, an index is out of
    /// bounds or a weight is not strictly positive and finite.
    pub fn new(
        indices: Vec<usize>,
        gammas: Vec<f32>,
        budget: usize,
        len: usize,
    ) -> Result<Self, SelectionError> {
        if indices.len() != gammas.len() {
            return Err(SelectionError::LengthMismatch {
                indices: indices.len(),
                gammas: gammas.len(),
            });
        }

        if indices.len() != budget {
            return Err(SelectionError::WrongSize {
                got: indices.len(),
                expected: budget,
            });
        }

        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(SelectionError::IndexOutOfBounds { index, len });
        }

        if let Some((position, &value)) = gammas
            .iter()
            .enumerate()
            .find(|(_, g)| !(g.is_finite() && **g > 0.0))
        {
            return Err(SelectionError::InvalidWeight { position, value });
        }

        Ok(Self { indices, gammas })
    }

    /// Wraps `indices` with a weight of 1 for every entry.
    ///
    /// # Errors
    /// Same as `Selection::new`.
    pub fn uniform(indices: Vec<usize>, budget: usize, len: usize) -> Result<Self, SelectionError> {
        let gammas = vec![1.0; indices.len()];
        Self::new(indices, gammas, budget, len)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    #[inline]
    pub fn gammas(&self) -> &[f32] {
        &self.gammas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_well_formed_selection() {
        let sel = Selection::new(vec![3, 1, 4], vec![1.0, 0.5, 2.0], 3, 5).unwrap();
        assert_eq!(sel.len(), 3);
        assert_eq!(sel.indices(), [3, 1, 4]);
        assert_eq!(sel.gammas(), [1.0, 0.5, 2.0]);
    }

    #[test]
    fn rejects_wrong_budget() {
        let res = Selection::uniform(vec![0, 1], 3, 5);
        assert!(matches!(
            res,
            Err(SelectionError::WrongSize { got: 2, expected: 3 })
        ));
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let res = Selection::new(vec![0, 1], vec![1.0], 2, 5);
        assert!(matches!(res, Err(SelectionError::LengthMismatch { .. })));
    }

    #[test]
    fn rejects_out_of_bounds_index() {
        let res = Selection::uniform(vec![0, 5], 2, 5);
        assert!(matches!(
            res,
            Err(SelectionError::IndexOutOfBounds { index: 5, len: 5 })
        ));
    }

    #[test]
    fn rejects_non_positive_or_non_finite_weights() {
        for bad in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let res = Selection::new(vec![0, 1], vec![1.0, bad], 2, 5);
            assert!(matches!(
                res,
                Err(SelectionError::InvalidWeight { position: 1, .. })
            ));
        }
    }
}
