use std::sync::Arc;

use log::{debug, trace};
use ml_core::{
    Checkpoint, Dataset, GreedyMode, LossFn, Model, Selection, SelectionError, SelectionStrategy,
};
use ndarray::Array1;
use rand::{rngs::StdRng, seq::index, SeedableRng};

use crate::{
    embedding::{mean_row, Embedder},
    grouping::check_budget,
};

/// Candidate pools are sized so that each pick is within `1 - 1/e` of the best remaining gain
/// with probability `1 - STOCHASTIC_EPS`.
const STOCHASTIC_EPS: f64 = 0.01;

/// Bi-level validation-driven selection with a stochastic greedy search.
///
/// The gain of an example is the first order decrease of the validation loss after a step of
/// size `eta` along that example's gradient embedding. After every pick the validation gradient
/// is recomputed exactly for the last-layer bias step the picks so far imply. All weights are 1.
pub struct Glister<M, L, D: ?Sized> {
    embedder: Embedder<M, L>,
    train: Arc<D>,
    valid: Arc<D>,
    eta: f32,
    rng: StdRng,
}

impl<M, L, D> Glister<M, L, D>
where
    M: Model + Checkpoint,
    L: LossFn,
    D: Dataset + ?Sized,
{
    /// Creates a new `Glister` strategy.
    ///
    /// # Arguments
    /// * `embedder` - The private model copy used to score examples.
    /// * `train` - The training set.
    /// * `valid` - The validation set whose loss the selection tries to decrease.
    /// * `eta` - The step size of the inner update, usually the training learning rate.
    /// * `seed` - Seeds the candidate pools.
    pub fn new(embedder: Embedder<M, L>, train: Arc<D>, valid: Arc<D>, eta: f32, seed: u64) -> Self {
        Self {
            embedder,
            train,
            valid,
            eta,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

fn pool_size(len: usize, budget: usize) -> usize {
    let size = (len as f64 / budget as f64 * (1. / STOCHASTIC_EPS).ln()).ceil();
    (size as usize).max(1)
}

impl<M, L, D> SelectionStrategy<M::State> for Glister<M, L, D>
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
        let len = self.train.len();
        check_budget(budget, len)?;

        if self.valid.is_empty() {
            return Err(SelectionError::Optimization(
                "validation-driven selection needs a non-empty validation split".into(),
            ));
        }

        self.embedder.load(&state)?;

        let all: Vec<usize> = (0..len).collect();
        let train_emb = self.embedder.embeddings(&*self.train, &all)?;

        let valid_all: Vec<usize> = (0..self.valid.len()).collect();
        let (val_pred, val_y) = self.embedder.outputs(&*self.valid, &valid_all)?;
        let mut val_grad = mean_row(&self.embedder.loss().loss_prime(val_pred.view(), val_y.view()));

        let eta = self.eta;
        let pool = pool_size(len, budget);
        let mut remaining = all;
        let mut selected = Vec::with_capacity(budget);
        let mut shift = Array1::<f32>::zeros(train_emb.ncols());

        debug!(budget = budget, pool = pool; "starting stochastic greedy selection");

        while selected.len() < budget {
            let size = pool.min(remaining.len());
            let candidates = index::sample(&mut self.rng, remaining.len(), size);

            let best = candidates
                .iter()
                .map(|pos| {
                    let gain = eta * train_emb.row(remaining[pos]).dot(&val_grad);
                    (pos, gain)
                })
                .max_by(|a, b| {
                    a.1.total_cmp(&b.1)
                        .then(remaining[b.0].cmp(&remaining[a.0]))
                });

            let Some((pos, gain)) = best else {
                break;
            };

            let picked = remaining.swap_remove(pos);
            selected.push(picked);
            trace!(index = picked, gain = gain; "picked");

            // A bias step shifts every validation output by the same amount.
            shift.scaled_add(-eta, &train_emb.row(picked));
            let shifted = &val_pred + &shift;
            val_grad = mean_row(&self.embedder.loss().loss_prime(shifted.view(), val_y.view()));

            if val_grad.iter().any(|v| !v.is_finite()) {
                return Err(SelectionError::Optimization(
                    "validation gradient diverged".into(),
                ));
            }
        }

        Selection::uniform(selected, budget, len)
    }
}
