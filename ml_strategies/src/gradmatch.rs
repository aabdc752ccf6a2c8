use std::sync::Arc;

use log::debug;
use ml_core::{
    Checkpoint, Dataset, GreedyMode, LossFn, Model, Selection, SelectionError, SelectionStrategy,
};
use ndarray::Axis;
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    embedding::{batch_means, Embedder},
    grouping::{
        apportion, batch_ranges, check_budget, class_groups, expand_batches, fill_random, Grouping,
    },
    omp::nonneg_omp,
};

/// Gradient-matching coreset selection.
///
/// For every group, finds a sparse non-negative combination of example (or mini-batch)
/// gradient embeddings that matches the group's full gradient, and uses the combination
/// coefficients as weights. Picks that end up short of the budget are topped up with random
/// examples of weight 1.
pub struct GradMatch<M, L, D: ?Sized> {
    embedder: Embedder<M, L>,
    data: Arc<D>,
    grouping: Grouping,
    lam: f32,
    eps: f32,
    rng: StdRng,
}

impl<M, L, D> GradMatch<M, L, D>
where
    M: Model + Checkpoint,
    L: LossFn,
    D: Dataset + ?Sized,
{
    /// Creates a new `GradMatch` strategy.
    ///
    /// # Arguments
    /// * `embedder` - The private model copy used to score examples.
    /// * `data` - The training set.
    /// * `grouping` - Per class or per mini-batch selection.
    /// * `lam` - Ridge regularization of the matching problem.
    /// * `eps` - Residual norm under which matching stops early.
    /// * `seed` - Seeds the random fill.
    pub fn new(
        embedder: Embedder<M, L>,
        data: Arc<D>,
        grouping: Grouping,
        lam: f32,
        eps: f32,
        seed: u64,
    ) -> Self {
        Self {
            embedder,
            data,
            grouping,
            lam,
            eps,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<M, L, D> SelectionStrategy<M::State> for GradMatch<M, L, D>
where
    M: Model + Checkpoint,
    L: LossFn,
    D: Dataset + ?Sized,
{
    fn select(
        &mut self,
        budget: usize,
        state: M::State,
        _mode: Option<GreedyMode>,
    ) -> Result<Selection, SelectionError> {
        let len = self.data.len();
        check_budget(budget, len)?;

        self.embedder.load(&state)?;
        let all: Vec<usize> = (0..len).collect();
        let embeddings = self.embedder.embeddings(&*self.data, &all)?;

        let (mut indices, mut gammas) = match self.grouping {
            Grouping::PerClass => {
                let groups = class_groups(&*self.data)?;
                let sizes: Vec<_> = groups.iter().map(Vec::len).collect();
                let budgets = apportion(budget, &sizes);

                let mut indices = Vec::with_capacity(budget);
                let mut gammas = Vec::with_capacity(budget);

                for (members, k) in groups.iter().zip(budgets).filter(|(_, k)| *k > 0) {
                    let atoms = embeddings.select(Axis(0), members);
                    let target = atoms.sum_axis(Axis(0));
                    let solution = nonneg_omp(atoms.view(), target.view(), k, self.lam, self.eps)?;

                    indices.extend(solution.atoms.iter().map(|&a| members[a]));
                    gammas.extend(solution.coefs);
                }

                (indices, gammas)
            }
            Grouping::PerBatch { batch_size } => {
                let batches = batch_ranges(len, batch_size);
                let atoms = batch_means(&embeddings, &batches);
                let target = atoms.sum_axis(Axis(0));
                let nnz = budget.div_ceil(batch_size.max(1)).min(batches.len());

                let solution = nonneg_omp(atoms.view(), target.view(), nnz, self.lam, self.eps)?;
                let chosen: Vec<_> = solution.atoms.into_iter().zip(solution.coefs).collect();
                expand_batches(&chosen, &batches, budget)
            }
        };

        let picked = indices.len();
        fill_random(&mut indices, &mut gammas, budget, len, &mut self.rng);
        debug!(picked = picked, filled = budget - picked; "gradmatch selection finished");

        Selection::new(indices, gammas, budget, len)
    }
}

#[cfg(test)]
mod tests {
    use machine_learning::{
        arch::{layers::Layer, loss::Mse, Sequential},
        dataset,
    };
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn strategy(grouping: Grouping) -> (GradMatch<Sequential, Mse, dataset::InMemoryDataset>, Sequential) {
        let mut rng = StdRng::seed_from_u64(4);
        let data = Arc::new(dataset::blobs(40, 3, 2, 1., &mut rng).unwrap());

        let mut model = Sequential::new([Layer::dense((3, 2), None)]);
        model.params_and_grad().0.iter_mut().enumerate().for_each(|(i, p)| *p = 0.1 * i as f32);

        let embedder = Embedder::new(model.clone(), Mse, 8);
        (GradMatch::new(embedder, data, grouping, 0.5, 1e-10, 1), model)
    }

    #[test]
    fn selections_hold_exactly_the_budget() {
        for grouping in [Grouping::PerClass, Grouping::PerBatch { batch_size: 8 }] {
            let (mut strategy, model) = strategy(grouping);

            for budget in [1, 7, 20, 40] {
                let selection = strategy.select(budget, model.snapshot(), None).unwrap();
                assert_eq!(selection.len(), budget);
                assert!(selection.gammas().iter().all(|g| *g > 0.));
            }
        }
    }

    #[test]
    fn same_seed_same_selection() {
        let (mut a, model) = strategy(Grouping::PerClass);
        let (mut b, _) = strategy(Grouping::PerClass);

        let first = a.select(10, model.snapshot(), None).unwrap();
        let second = b.select(10, model.snapshot(), None).unwrap();
        assert_eq!(first, second);
    }
}
