use log::trace;
use machine_learning::optimization::LrSchedule;
use ml_core::{
    BatchStats, Dataset, LossFn, LrScheduler, MlError, Model, Optimizer, argmax_matches,
};
use ndarray::{Array1, Axis};

use crate::{CoresetErr, Result, subset::TrainingView};

/// Accumulated results of one training epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpochStats {
    /// The sum of the reduced batch losses.
    pub loss: f32,
    pub correct: usize,
    pub samples: usize,
    pub batches: usize,
}

impl EpochStats {
    fn add(&mut self, batch: BatchStats) {
        self.loss += batch.loss();
        self.correct += batch.correct();
        self.samples += batch.samples();
        self.batches += 1;
    }

    /// The fraction of correct predictions, 0 if nothing was trained on.
    pub fn accuracy(&self) -> f32 {
        if self.samples == 0 {
            return 0.;
        }
        self.correct as f32 / self.samples as f32
    }
}

/// The normalized per-example coefficients of a batch loss.
///
/// Unweighted batches minimize the mean, `1/n` each; weighted batches minimize
/// `dot(losses, w) / sum(w)`, `w / sum(w)` each. Scaling every weight by the same positive
/// constant leaves the coefficients unchanged.
///
/// # Errors
/// The first weight that is not finite and strictly positive, or the weight sum if it
/// overflows.
pub fn coefficients(n: usize, weights: Option<&[f32]>) -> std::result::Result<Array1<f32>, f32> {
    let Some(weights) = weights else {
        return Ok(Array1::from_elem(n, 1. / n.max(1) as f32));
    };

    if let Some(&bad) = weights.iter().find(|w| !(w.is_finite() && **w > 0.)) {
        return Err(bad);
    }

    let sum: f32 = weights.iter().sum();
    if !sum.is_finite() {
        return Err(sum);
    }

    Ok(weights.iter().map(|w| w / sum).collect())
}

/// Runs training epochs over a `TrainingView`, weighted or not.
#[derive(Debug, Clone)]
pub struct WeightedTrainer<O, L> {
    optimizer: O,
    loss: L,
    schedule: LrSchedule,
}

impl<O, L> WeightedTrainer<O, L>
where
    O: Optimizer,
    L: LossFn,
{
    /// Creates a new `WeightedTrainer`, setting the optimizer to the schedule's first rate.
    pub fn new(mut optimizer: O, loss: L, schedule: LrSchedule) -> Self {
        optimizer.set_learning_rate(schedule.current());
        Self {
            optimizer,
            loss,
            schedule,
        }
    }

    pub fn learning_rate(&self) -> f32 {
        self.optimizer.learning_rate()
    }

    pub fn loss(&self) -> &L {
        &self.loss
    }

    /// Trains `model` for one epoch over `view`, then advances the learning rate schedule.
    ///
    /// For every batch the backward signal of example `j` is `c_j * dl_j/dy_j` with `c` given
    /// by `coefficients`, followed by one optimizer step.
    ///
    /// # Errors
    /// Returns `CoresetErr::NumericalDivergence` as soon as a batch loss is not finite or a
    /// batch weight is not finite and positive, plus any model, data or optimizer error.
    pub fn train_epoch<M, D>(
        &mut self,
        model: &mut M,
        data: &D,
        view: &TrainingView,
        epoch: usize,
    ) -> Result<EpochStats>
    where
        M: Model,
        D: Dataset + ?Sized,
    {
        let mut stats = EpochStats::default();

        for (b, batch) in view.batches().enumerate() {
            let examples = data.gather(batch.indices)?;
            let n = examples.len();

            let weights = batch.weights.as_deref();
            if let Some(w) = weights {
                if w.len() != n {
                    return Err(MlError::ShapeMismatch {
                        what: "batch weights",
                        got: w.len(),
                        expected: n,
                    }
                    .into());
                }
            }

            let coefs = coefficients(n, weights).map_err(|value| {
                CoresetErr::NumericalDivergence {
                    epoch,
                    batch: b,
                    what: "batch weight",
                    value,
                }
            })?;

            model.zero_grad();
            let y_pred = model.forward(examples.x.view())?;

            let loss = self.loss.losses(y_pred.view(), examples.y.view()).dot(&coefs);
            if !loss.is_finite() {
                return Err(CoresetErr::NumericalDivergence {
                    epoch,
                    batch: b,
                    what: "loss",
                    value: loss,
                });
            }

            let mut signal = self.loss.loss_prime(y_pred.view(), examples.y.view());
            signal *= &coefs.view().insert_axis(Axis(1));
            model.backward(signal.view())?;

            let (params, grad) = model.params_and_grad();
            self.optimizer.update_params(grad, params)?;

            let correct = argmax_matches(y_pred.view(), examples.y.view());
            stats.add(BatchStats::new(loss, correct, n));
            trace!(epoch = epoch, batch = b, loss = loss; "batch trained");
        }

        let lr = self.schedule.step();
        self.optimizer.set_learning_rate(lr);

        Ok(stats)
    }
}
