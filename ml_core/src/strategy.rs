use crate::{Selection, SelectionError};

/// Greedy variant for strategies whose optimization trades speed for quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GreedyMode {
    /// Re-evaluates every candidate's gain at every step.
    Exact,
    /// Keeps stale upper bounds and only re-evaluates the current best.
    #[default]
    Lazy,
}

/// Abstraction over a subset-selection algorithm.
///
/// This trait is the *selection policy boundary*: the training controller
/// decides when to call it and what to do with the result, implementations
/// decide which samples matter. `S` is the opaque model state the controller
/// snapshots before each call.
pub trait SelectionStrategy<S> {
    /// Selects `budget` samples and their importance weights.
    ///
    /// # Args
    /// * `budget` - Amount of samples to select, greater than 0.
    /// * `state` - An independent snapshot of the live model. The strategy
    ///   owns it and may mutate it freely.
    /// * `mode` - Optional greedy variant, ignored by strategies without one.
    ///
    /// # Returns
    /// A `Selection` holding exactly `budget` entries.
    ///
    /// # Errors
    /// Returns a `SelectionError` if `budget` cannot be satisfied or the
    /// strategy's inner optimization fails.
    fn select(
        &mut self,
        budget: usize,
        state: S,
        mode: Option<GreedyMode>,
    ) -> Result<Selection, SelectionError>;
}
