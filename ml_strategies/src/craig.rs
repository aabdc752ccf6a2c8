use std::sync::Arc;

use log::debug;
use ml_core::{
    Checkpoint, Dataset, GreedyMode, LossFn, Model, Selection, SelectionError, SelectionStrategy,
};
use ndarray::{Array2, Axis};
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;

use crate::{
    embedding::{batch_means, Embedder},
    facility::{cluster_weights, greedy, similarity},
    grouping::{
        apportion, batch_ranges, check_budget, class_groups, expand_batches, fill_random, Grouping,
    },
};

/// Facility-location coreset selection.
///
/// Picks the examples (or mini-batches) whose gradient embeddings best cover their group and
/// weights each pick by the amount of group members it is the closest pick of. Groups are
/// solved in parallel.
pub struct Craig<M, L, D: ?Sized> {
    embedder: Embedder<M, L>,
    data: Arc<D>,
    grouping: Grouping,
    rng: StdRng,
}

impl<M, L, D> Craig<M, L, D>
where
    M: Model + Checkpoint,
    L: LossFn,
    D: Dataset + ?Sized,
{
    /// Creates a new `Craig` strategy.
    ///
    /// # Arguments
    /// * `embedder` - The private model copy used to score examples.
    /// * `data` - The training set.
    /// * `grouping` - Per class or per mini-batch selection.
    /// * `seed` - Seeds the random fill used when picks fall short of the budget.
    pub fn new(embedder: Embedder<M, L>, data: Arc<D>, grouping: Grouping, seed: u64) -> Self {
        Self {
            embedder,
            data,
            grouping,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

fn solve_group(embeddings: &Array2<f32>, k: usize, mode: GreedyMode) -> (Vec<usize>, Vec<f32>) {
    let sim = similarity(embeddings.view());
    let picks = greedy(sim.view(), k, mode);
    let weights = cluster_weights(sim.view(), &picks);
    (picks, weights)
}

impl<M, L, D> SelectionStrategy<M::State> for Craig<M, L, D>
where
    M: Model + Checkpoint,
    L: LossFn,
    D: Dataset + ?Sized,
{
    fn select(
        &mut self,
        budget: usize,
        state: M::State,
        mode: Option<GreedyMode>,
    ) -> Result<Selection, SelectionError> {
        let len = self.data.len();
        check_budget(budget, len)?;

        let mode = mode.unwrap_or_default();
        self.embedder.load(&state)?;

        let all: Vec<usize> = (0..len).collect();
        let embeddings = self.embedder.embeddings(&*self.data, &all)?;

        let (mut indices, mut gammas) = match self.grouping {
            Grouping::PerClass => {
                let groups = class_groups(&*self.data)?;
                let sizes: Vec<_> = groups.iter().map(Vec::len).collect();
                let budgets = apportion(budget, &sizes);

                let work: Vec<_> = groups
                    .into_iter()
                    .zip(budgets)
                    .filter(|(_, k)| *k > 0)
                    .map(|(members, k)| (embeddings.select(Axis(0), &members), members, k))
                    .collect();

                debug!(budget = budget, groups = work.len(); "solving facility location per class");

                let solved: Vec<_> = work
                    .into_par_iter()
                    .map(|(emb, members, k)| {
                        let (picks, weights) = solve_group(&emb, k, mode);
                        let picks: Vec<_> = picks.into_iter().map(|p| members[p]).collect();
                        (picks, weights)
                    })
                    .collect();

                solved.into_iter().fold(
                    (Vec::with_capacity(budget), Vec::with_capacity(budget)),
                    |(mut indices, mut gammas), (picks, weights)| {
                        indices.extend(picks);
                        gammas.extend(weights);
                        (indices, gammas)
                    },
                )
            }
            Grouping::PerBatch { batch_size } => {
                let batches = batch_ranges(len, batch_size);
                let means = batch_means(&embeddings, &batches);
                let k = budget.div_ceil(batch_size.max(1)).min(batches.len());

                debug!(budget = budget, batches = batches.len(), picks = k; "solving facility location per batch");

                let (picks, weights) = solve_group(&means, k, mode);
                let chosen: Vec<_> = picks.into_iter().zip(weights).collect();
                expand_batches(&chosen, &batches, budget)
            }
        };

        let picked = indices.len();
        fill_random(&mut indices, &mut gammas, budget, len, &mut self.rng);
        debug!(picked = picked, filled = budget - picked; "craig selection finished");

        Selection::new(indices, gammas, budget, len)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use machine_learning::{
        arch::{layers::Layer, loss::Mse, ParamSnapshot, Sequential},
        dataset::InMemoryDataset,
    };
    use ndarray::Array2;

    use super::*;

    fn dataset() -> Arc<InMemoryDataset> {
        // Two tight clusters per class, sizes 6 and 2.
        let x = Array2::from_shape_fn((16, 1), |(i, _)| match i % 8 {
            0..=5 => 0.01 * i as f32,
            _ => 10. + 0.01 * i as f32,
        });
        let labels: Vec<_> = (0..16).map(|i| i / 8).collect();
        Arc::new(InMemoryDataset::from_labels(x, &labels, 2).unwrap())
    }

    fn craig(grouping: Grouping) -> (Craig<Sequential, Mse, InMemoryDataset>, ParamSnapshot) {
        // Both outputs copy the input, so an embedding is `x - y`.
        let model =
            Sequential::with_params([Layer::dense((1, 2), None)], vec![1., 1., 0., 0.]).unwrap();
        let state = model.snapshot();
        let strategy = Craig::new(Embedder::new(model, Mse, 4), dataset(), grouping, 0);
        (strategy, state)
    }

    #[test]
    fn per_class_weights_cover_each_class() {
        let (mut strategy, state) = craig(Grouping::PerClass);

        let selection = strategy.select(4, state, Some(GreedyMode::Exact)).unwrap();

        assert_eq!(selection.len(), 4);
        let (first, second): (Vec<_>, Vec<_>) = selection
            .indices()
            .iter()
            .zip(selection.gammas())
            .partition(|pair| *pair.0 < 8);

        let class_mass = |picks: &[(&usize, &f32)]| picks.iter().map(|pair| *pair.1).sum::<f32>();
        assert_eq!(first.len(), 2);
        assert_eq!(class_mass(&first[..]), 8.);
        assert_eq!(class_mass(&second[..]), 8.);
    }

    #[test]
    fn per_batch_returns_exactly_the_budget() {
        let (mut strategy, state) = craig(Grouping::PerBatch { batch_size: 3 });

        let selection = strategy.select(5, state, None).unwrap();
        assert_eq!(selection.len(), 5);
    }

    #[test]
    fn rejects_oversized_budget() {
        let (mut strategy, state) = craig(Grouping::PerClass);

        assert!(matches!(
            strategy.select(17, state, None),
            Err(SelectionError::BudgetExceedsPool { budget: 17, pool: 16 })
        ));
    }
}
