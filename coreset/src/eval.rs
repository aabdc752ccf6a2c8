use std::time::Duration;

use ml_core::{Dataset, LossFn, Model, argmax_matches};

use crate::{CoresetErr, Result, configs::PrintArg, trainer::EpochStats};

/// Amount of samples per forward pass while evaluating.
const EVAL_BATCH_SIZE: usize = 1000;

/// Mean per-example loss and argmax accuracy of a model over a split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitMetrics {
    pub loss: f32,
    pub accuracy: f32,
}

/// Measures `model` over all of `data` without updating it.
pub fn measure<M, L, D>(model: &mut M, loss: &L, data: &D, batch_size: usize) -> Result<SplitMetrics>
where
    M: Model,
    L: LossFn,
    D: Dataset + ?Sized,
{
    let all: Vec<usize> = (0..data.len()).collect();
    let mut total_loss = 0.;
    let mut correct = 0;

    for chunk in all.chunks(batch_size.max(1)) {
        let batch = data.gather(chunk)?;
        let y_pred = model.forward(batch.x.view())?;

        total_loss += loss.losses(y_pred.view(), batch.y.view()).sum();
        correct += argmax_matches(y_pred.view(), batch.y.view());
    }

    let len = data.len().max(1) as f32;
    Ok(SplitMetrics {
        loss: total_loss / len,
        accuracy: correct as f32 / len,
    })
}

/// The splits an evaluation may look at.
#[derive(Debug)]
pub struct EvalSplits<'a, D: ?Sized> {
    pub train: &'a D,
    pub valid: Option<&'a D>,
    pub test: Option<&'a D>,
}

// Manual impls, `D` itself needn't be `Clone`.
impl<D: ?Sized> Clone for EvalSplits<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: ?Sized> Copy for EvalSplits<'_, D> {}

/// The metrics of one evaluation, in the order they were requested.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalReport {
    values: Vec<(PrintArg, f64)>,
}

impl EvalReport {
    pub fn from_entries(values: Vec<(PrintArg, f64)>) -> Self {
        Self { values }
    }

    pub fn get(&self, arg: PrintArg) -> Option<f64> {
        self.values
            .iter()
            .find(|entry| entry.0 == arg)
            .map(|entry| entry.1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PrintArg, f64)> {
        self.values.iter().copied()
    }
}

/// Periodic evaluation of the live model.
#[derive(Debug, Clone)]
pub struct Evaluator {
    print_every: usize,
    args: Vec<PrintArg>,
}

impl Evaluator {
    pub fn new(print_every: usize, args: Vec<PrintArg>) -> Self {
        Self {
            print_every: print_every.max(1),
            args,
        }
    }

    /// Whether `epoch` is an evaluation epoch.
    #[inline]
    pub fn due(&self, epoch: usize) -> bool {
        epoch % self.print_every == 0
    }

    /// Fails if a requested metric needs a split that doesn't exist.
    pub fn check<D: Dataset + ?Sized>(&self, splits: &EvalSplits<'_, D>) -> Result<()> {
        for &arg in &self.args {
            let available = match arg {
                PrintArg::ValLoss | PrintArg::ValAcc => splits.valid.is_some_and(|d| !d.is_empty()),
                PrintArg::TstLoss | PrintArg::TstAcc => splits.test.is_some_and(|d| !d.is_empty()),
                _ => true,
            };

            if !available {
                return Err(CoresetErr::InvalidConfig(format!(
                    "print_args requests {arg:?} but that split is empty"
                )));
            }
        }

        Ok(())
    }

    /// Evaluates the requested metrics.
    ///
    /// # Arguments
    /// * `model` - The live model, only run forward.
    /// * `loss` - The training loss.
    /// * `splits` - The data to measure.
    /// * `subset` - The statistics of the epoch that just ended.
    /// * `timing` - The epoch's selection plus training time.
    pub fn evaluate<M, L, D>(
        &self,
        model: &mut M,
        loss: &L,
        splits: EvalSplits<'_, D>,
        subset: &EpochStats,
        timing: Duration,
    ) -> Result<EvalReport>
    where
        M: Model,
        L: LossFn,
        D: Dataset + ?Sized,
    {
        let wants = |a: PrintArg, b: PrintArg| self.args.contains(&a) || self.args.contains(&b);

        let mut run = |data: Option<&D>, wanted: bool| -> Result<Option<SplitMetrics>> {
            match data {
                Some(data) if wanted => measure(&mut *model, loss, data, EVAL_BATCH_SIZE).map(Some),
                _ => Ok(None),
            }
        };

        let trn = run(Some(splits.train), wants(PrintArg::TrnLoss, PrintArg::TrnAcc))?;
        let val = run(splits.valid, wants(PrintArg::ValLoss, PrintArg::ValAcc))?;
        let tst = run(splits.test, wants(PrintArg::TstLoss, PrintArg::TstAcc))?;

        let values = self
            .args
            .iter()
            .filter_map(|&arg| {
                let value = match arg {
                    PrintArg::TrnLoss => trn?.loss,
                    PrintArg::TrnAcc => trn?.accuracy,
                    PrintArg::ValLoss => val?.loss,
                    PrintArg::ValAcc => val?.accuracy,
                    PrintArg::TstLoss => tst?.loss,
                    PrintArg::TstAcc => tst?.accuracy,
                    PrintArg::SubtrnLoss => subset.loss,
                    PrintArg::SubtrnAcc => subset.accuracy(),
                    PrintArg::Time => return Some((arg, timing.as_secs_f64())),
                };
                Some((arg, value as f64))
            })
            .collect();

        Ok(EvalReport { values })
    }
}

#[cfg(test)]
mod tests {
    use machine_learning::{
        arch::{Sequential, layers::Layer, loss::Mse},
        dataset::InMemoryDataset,
    };
    use ndarray::array;

    use super::*;

    fn split() -> InMemoryDataset {
        InMemoryDataset::new(
            array![[1., 0.], [0., 1.], [1., 1.]],
            array![[1., 0.], [0., 1.], [0., 1.]],
        )
        .unwrap()
    }

    fn identity() -> Sequential {
        Sequential::with_params([Layer::dense((2, 2), None)], vec![1., 0., 0., 1., 0., 0.])
            .unwrap()
    }

    #[test]
    fn measure_reports_mean_loss_and_accuracy() {
        let data = split();
        let metrics = measure(&mut identity(), &Mse, &data, 2).unwrap();

        // Only the last sample is off, by 1 in its first output.
        assert!((metrics.loss - 0.5 / 3.).abs() < 1e-6);
        assert!((metrics.accuracy - 2. / 3.).abs() < 1e-6);
    }

    #[test]
    fn measuring_leaves_the_model_alone() {
        let data = split();
        let mut model = identity();
        measure(&mut model, &Mse, &data, 1).unwrap();
        assert_eq!(model.params(), identity().params());
    }

    #[test]
    fn reports_follow_the_requested_order() {
        let data = split();
        let evaluator = Evaluator::new(
            2,
            vec![PrintArg::Time, PrintArg::ValAcc, PrintArg::SubtrnLoss],
        );
        let splits = EvalSplits {
            train: &data,
            valid: Some(&data),
            test: None,
        };
        let subset = EpochStats {
            loss: 1.5,
            correct: 1,
            samples: 2,
            batches: 1,
        };

        let report = evaluator
            .evaluate(&mut identity(), &Mse, splits, &subset, Duration::from_secs(3))
            .unwrap();

        let args: Vec<_> = report.iter().map(|entry| entry.0).collect();
        assert_eq!(args, [PrintArg::Time, PrintArg::ValAcc, PrintArg::SubtrnLoss]);
        assert_eq!(report.get(PrintArg::Time), Some(3.));
        assert_eq!(report.get(PrintArg::SubtrnLoss), Some(1.5));
        assert!(report.get(PrintArg::TstAcc).is_none());
        assert!(evaluator.due(4) && !evaluator.due(3));
    }

    #[test]
    fn missing_splits_are_rejected() {
        let data = split();
        let evaluator = Evaluator::new(1, vec![PrintArg::TstLoss]);
        let splits = EvalSplits {
            train: &data,
            valid: None,
            test: None,
        };

        assert!(matches!(
            evaluator.check(&splits),
            Err(CoresetErr::InvalidConfig(_))
        ));
    }
}
