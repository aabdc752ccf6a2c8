use std::{io::Write, sync::Arc, time::Instant};

use log::{debug, info};
use ml_core::{Checkpoint, Dataset, GreedyMode, LossFn, Model, Optimizer, SelectionStrategy};
use ml_strategies::RandomStrategy;

use crate::{
    CoresetErr, Result,
    eval::{EvalSplits, Evaluator},
    isolation::isolated_select,
    metrics::{EpochRecord, MetricsRecorder},
    run_log::{RunLog, epoch_line},
    schedule::{Phase, Schedule},
    subset::{SubsetBuilder, TrainingView},
    trainer::WeightedTrainer,
};

/// The splits of a run, shared with the strategies that read them.
#[derive(Debug)]
pub struct RunData<D: ?Sized> {
    pub train: Arc<D>,
    pub valid: Option<Arc<D>>,
    pub test: Option<Arc<D>>,
}

impl<D: ?Sized> RunData<D> {
    fn splits(&self) -> EvalSplits<'_, D> {
        EvalSplits {
            train: &self.train,
            valid: self.valid.as_deref(),
            test: self.test.as_deref(),
        }
    }
}

/// The fixed parameters of a controller.
#[derive(Debug, Clone)]
pub struct Settings {
    /// The configured strategy name.
    pub name: String,
    pub schedule: Schedule,
    pub budget: usize,
    pub greedy: GreedyMode,
    pub batch_size: usize,
    pub shuffle: bool,
    pub num_epochs: usize,
    pub seed: u64,
}

/// Drives a whole training run, deciding per epoch whether to reselect and what to train on.
///
/// The controller exclusively owns the live model. Strategies only ever see an owned snapshot
/// of it through `isolated_select`.
pub struct Controller<M, O, L, D: ?Sized, S> {
    name: String,
    model: M,
    trainer: WeightedTrainer<O, L>,
    strategy: Option<S>,
    schedule: Schedule,
    budget: usize,
    greedy: GreedyMode,
    builder: SubsetBuilder,
    full_view: TrainingView,
    subset: Option<TrainingView>,
    data: RunData<D>,
    evaluator: Evaluator,
    metrics: MetricsRecorder,
    num_epochs: usize,
    phase: Option<Phase>,
}

impl<M, O, L, D, S> Controller<M, O, L, D, S>
where
    M: Model + Checkpoint,
    O: Optimizer,
    L: LossFn,
    D: Dataset + ?Sized,
    S: SelectionStrategy<M::State>,
{
    /// Creates a new `Controller`.
    ///
    /// Schedules that train on subsets start from a uniformly random one, drawn here.
    ///
    /// # Arguments
    /// * `model` - The live model.
    /// * `trainer` - Trains the model over a view.
    /// * `strategy` - The selection strategy, `None` only for full-data schedules.
    /// * `data` - The splits of the run.
    /// * `evaluator` - The periodic evaluation.
    /// * `settings` - The fixed parameters.
    ///
    /// # Errors
    /// Returns `CoresetErr::InvalidConfig` if the budget doesn't fit the training split, a
    /// selecting schedule has no strategy or the evaluator asks for a missing split.
    pub fn new(
        model: M,
        trainer: WeightedTrainer<O, L>,
        strategy: Option<S>,
        data: RunData<D>,
        evaluator: Evaluator,
        settings: Settings,
    ) -> Result<Self> {
        let len = data.train.len();
        let Settings {
            name,
            schedule,
            budget,
            greedy,
            batch_size,
            shuffle,
            num_epochs,
            seed,
        } = settings;

        if budget == 0 || budget > len {
            return Err(CoresetErr::InvalidConfig(format!(
                "budget ({budget}) must be in [1, {len}]"
            )));
        }

        if strategy.is_none() && (0..num_epochs).any(|e| schedule.plan(e).select) {
            return Err(CoresetErr::InvalidConfig(format!(
                "{name} reselects but has no strategy"
            )));
        }

        evaluator.check(&data.splits())?;

        let mut builder = SubsetBuilder::new(batch_size, shuffle, seed);
        let subset = if schedule.uses_subsets() {
            let initial = RandomStrategy::fixed(len, budget, seed)?.select(budget, (), None)?;
            Some(builder.build(&initial))
        } else {
            None
        };

        Ok(Self {
            name,
            model,
            trainer,
            strategy,
            schedule,
            budget,
            greedy,
            builder,
            full_view: TrainingView::full(len, batch_size),
            subset,
            data,
            evaluator,
            metrics: MetricsRecorder::new(),
            num_epochs,
            phase: None,
        })
    }

    /// Runs every epoch, writing evaluations and the closing summary to `log`.
    pub fn run<W: Write>(&mut self, log: &mut RunLog<W>) -> Result<&MetricsRecorder> {
        info!(
            "starting {} for {} epochs, budget {} of {}",
            self.name,
            self.num_epochs,
            self.budget,
            self.data.train.len()
        );

        log.start()?;
        for epoch in 0..self.num_epochs {
            self.run_epoch(epoch)?;

            if let Some(eval) = self.metrics.last().and_then(|r| r.eval.as_ref()) {
                log.epoch(epoch, eval)?;
            }
        }
        log.finish(&self.name, &self.metrics)?;

        info!(
            "{} finished, total time {:.4} hours",
            self.name,
            self.metrics.total_hours()
        );
        Ok(&self.metrics)
    }

    /// Runs a single epoch: an optional reselection, one pass over the planned view and, when
    /// due, an evaluation.
    pub fn run_epoch(&mut self, epoch: usize) -> Result<&EpochRecord> {
        let plan = self.schedule.plan(epoch);

        let start = Instant::now();
        if plan.select {
            self.reselect(epoch)?;
        }
        let selection_time = start.elapsed();

        if self.phase != Some(plan.phase) {
            info!("epoch {epoch}: entering {:?} phase", plan.phase);
            self.phase = Some(plan.phase);
        }

        let view = match plan.phase {
            Phase::Full => &self.full_view,
            Phase::Subset => self
                .subset
                .as_ref()
                .ok_or(CoresetErr::MissingSubset { epoch })?,
        };

        let start = Instant::now();
        let stats = self
            .trainer
            .train_epoch(&mut self.model, &*self.data.train, view, epoch)?;
        let train_time = start.elapsed();

        debug!(
            epoch = epoch,
            loss = stats.loss,
            accuracy = stats.accuracy(),
            lr = self.trainer.learning_rate();
            "epoch trained"
        );

        let subset_size = view.len();
        let fingerprint = view.fingerprint();

        let eval = if self.evaluator.due(epoch) {
            let report = self.evaluator.evaluate(
                &mut self.model,
                self.trainer.loss(),
                self.data.splits(),
                &stats,
                selection_time + train_time,
            )?;

            info!("{}", epoch_line(epoch, &report));
            Some(report)
        } else {
            None
        };

        Ok(self.metrics.record(EpochRecord {
            epoch,
            selected: plan.select,
            phase: plan.phase,
            subset_size,
            fingerprint,
            selection_time,
            train_time,
            loss: stats.loss,
            accuracy: stats.accuracy(),
            eval,
        }))
    }

    fn reselect(&mut self, epoch: usize) -> Result<()> {
        let Some(strategy) = self.strategy.as_mut() else {
            return Ok(());
        };

        let selection =
            isolated_select(&mut self.model, strategy, self.budget, Some(self.greedy))?;

        let view = self.builder.build(&selection);
        info!(
            "epoch {epoch}: selected {} samples with {}, fingerprint {:016x}",
            view.len(),
            self.name,
            view.fingerprint()
        );

        self.subset = Some(view);
        Ok(())
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    pub fn current_subset(&self) -> Option<&TrainingView> {
        self.subset.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use machine_learning::{
        arch::{Sequential, layers::Layer, loss::Mse},
        dataset::InMemoryDataset,
        optimization::{GradientDescent, LrSchedule},
    };
    use ndarray::Array2;

    use super::*;

    #[test]
    fn subset_epochs_without_a_subset_fail() {
        let x = Array2::from_shape_fn((20, 1), |(i, _)| i as f32 / 20.);
        let labels: Vec<_> = (0..20).map(|i| i % 2).collect();
        let train = Arc::new(InMemoryDataset::from_labels(x, &labels, 2).unwrap());

        let settings = Settings {
            name: "Random".into(),
            schedule: Schedule::Static,
            budget: 5,
            greedy: GreedyMode::Lazy,
            batch_size: 5,
            shuffle: false,
            num_epochs: 1,
            seed: 0,
        };
        let data = RunData {
            train,
            valid: None,
            test: None,
        };
        let trainer = WeightedTrainer::new(GradientDescent::new(0.1), Mse, LrSchedule::constant(0.1));

        let mut run: Controller<_, _, _, _, RandomStrategy> = Controller::new(
            Sequential::new([Layer::dense((1, 2), None)]),
            trainer,
            None,
            data,
            Evaluator::new(1, Vec::new()),
            settings,
        )
        .unwrap();
        run.subset = None;

        let res = run.run_epoch(0);
        assert!(matches!(res, Err(CoresetErr::MissingSubset { epoch: 0 })));
        assert!(run.metrics().records().is_empty());
    }
}
