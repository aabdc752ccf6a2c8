use log::debug;
use ml_core::{GreedyMode, Selection, SelectionError, SelectionStrategy};
use rand::{rngs::StdRng, seq::index, SeedableRng};

use crate::grouping::check_budget;

/// Uniform sampling without replacement, all weights 1.
///
/// The online variant draws a fresh subset on every call. The fixed variant draws once at
/// construction and hands back that same subset forever.
#[derive(Debug, Clone)]
pub struct RandomStrategy {
    len: usize,
    rng: StdRng,
    fixed: Option<Vec<usize>>,
}

impl RandomStrategy {
    /// Creates a strategy that redraws on every call.
    pub fn online(len: usize, seed: u64) -> Self {
        Self {
            len,
            rng: StdRng::seed_from_u64(seed),
            fixed: None,
        }
    }

    /// Creates a strategy that draws `budget` indices now and keeps them.
    ///
    /// # Errors
    /// Returns a `SelectionError` unless `0 < budget <= len`.
    pub fn fixed(len: usize, budget: usize, seed: u64) -> Result<Self, SelectionError> {
        check_budget(budget, len)?;

        let mut rng = StdRng::seed_from_u64(seed);
        let subset = index::sample(&mut rng, len, budget).into_vec();

        Ok(Self {
            len,
            rng,
            fixed: Some(subset),
        })
    }
}

impl<S> SelectionStrategy<S> for RandomStrategy {
    fn select(
        &mut self,
        budget: usize,
        _state: S,
        _mode: Option<GreedyMode>,
    ) -> Result<Selection, SelectionError> {
        check_budget(budget, self.len)?;

        let indices = match &self.fixed {
            Some(subset) => subset.clone(),
            None => index::sample(&mut self.rng, self.len, budget).into_vec(),
        };

        debug!(budget = budget, online = self.fixed.is_none(); "random selection");
        Selection::uniform(indices, budget, self.len)
    }
}
