use std::{collections::HashSet, num::NonZeroUsize, sync::Arc};

use coreset::{
    controller::{Controller, RunData, Settings},
    eval::Evaluator,
    run_log::RunLog,
    schedule::{Phase, Schedule},
    trainer::WeightedTrainer,
};
use machine_learning::{
    arch::{Sequential, layers::Layer, loss::Mse},
    dataset::InMemoryDataset,
    optimization::{GradientDescent, LrSchedule},
};
use ml_core::GreedyMode;
use ml_strategies::RandomStrategy;
use ndarray::Array2;

type Run = Controller<Sequential, GradientDescent, Mse, InMemoryDataset, RandomStrategy>;

fn dataset(len: usize) -> Arc<InMemoryDataset> {
    let x = Array2::from_shape_fn((len, 1), |(i, _)| (i % 100) as f32 / 100.);
    let labels: Vec<_> = (0..len).map(|i| i % 2).collect();
    Arc::new(InMemoryDataset::from_labels(x, &labels, 2).unwrap())
}

fn controller(len: usize, fraction: f64, schedule: Schedule, num_epochs: usize) -> Run {
    let train = dataset(len);
    let budget = (fraction * len as f64).floor() as usize;

    let model = Sequential::with_params([Layer::dense((1, 2), None)], vec![0.1, -0.1, 0., 0.])
        .unwrap();
    let trainer = WeightedTrainer::new(GradientDescent::new(0.01), Mse, LrSchedule::constant(0.01));
    let strategy = RandomStrategy::online(len, 11);

    let data = RunData {
        train,
        valid: None,
        test: None,
    };
    let settings = Settings {
        name: "Random-Online".into(),
        schedule,
        budget,
        greedy: GreedyMode::Lazy,
        batch_size: 500,
        shuffle: true,
        num_epochs,
        seed: 3,
    };

    Controller::new(
        model,
        trainer,
        Some(strategy),
        data,
        Evaluator::new(1000, Vec::new()),
        settings,
    )
    .unwrap()
}

fn nz(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

#[test]
fn interval_run_reselects_only_at_its_triggers() {
    let mut run = controller(50_000, 0.1, Schedule::Interval { every: nz(20) }, 40);
    let metrics = run.run(&mut RunLog::new(Vec::new())).unwrap();

    assert_eq!(metrics.selections(), [19, 39]);

    let records = metrics.records();
    assert!(records.iter().all(|r| r.subset_size == 5000));
    assert!(records.iter().all(|r| r.phase == Phase::Subset));

    let initial = records[0].fingerprint;
    assert!(records[..19].iter().all(|r| r.fingerprint == initial));

    let first = records[19].fingerprint;
    assert_ne!(first, initial);
    assert!(records[19..39].iter().all(|r| r.fingerprint == first));
    assert_ne!(records[39].fingerprint, first);
}

#[test]
fn online_random_redraws_every_epoch() {
    let mut run = controller(200, 0.1, Schedule::EveryEpoch, 10);
    let metrics = run.run(&mut RunLog::new(Vec::new())).unwrap();

    assert_eq!(metrics.selections(), (0..10).collect::<Vec<_>>());

    let distinct: HashSet<_> = metrics.records().iter().map(|r| r.fingerprint).collect();
    assert_eq!(distinct.len(), 10);
}

#[test]
fn static_random_keeps_the_initial_subset() {
    let mut run = controller(200, 0.1, Schedule::Static, 10);
    let metrics = run.run(&mut RunLog::new(Vec::new())).unwrap();

    assert!(metrics.selections().is_empty());

    let initial = metrics.records()[0].fingerprint;
    assert!(metrics.records().iter().all(|r| r.fingerprint == initial));
    assert!(metrics.records().iter().all(|r| r.subset_size == 20));
}

#[test]
fn warm_start_trains_on_everything_first() {
    let schedule = Schedule::warm(nz(20), 0.1, 0.1, 100).unwrap();
    let mut run = controller(200, 0.1, schedule, 100);
    let metrics = run.run(&mut RunLog::new(Vec::new())).unwrap();
    let records = metrics.records();

    assert_eq!(records[0].phase, Phase::Full);
    assert_eq!(records[0].subset_size, 200);

    let initial = records[1].fingerprint;
    assert!(records[1..20].iter().all(|r| r.phase == Phase::Subset && r.fingerprint == initial));
    assert_eq!(metrics.selections(), [20, 40, 60, 80]);
}

#[test]
fn epochs_train_on_the_subset_they_just_selected() {
    let mut run = controller(200, 0.1, Schedule::EveryEpoch, 1);
    let initial = run.current_subset().map(|v| v.fingerprint());

    let fingerprint = {
        let record = run.run_epoch(0).unwrap();
        assert!(record.selected);
        assert_eq!(record.subset_size, 20);
        record.fingerprint
    };

    assert_eq!(run.current_subset().map(|v| v.fingerprint()), Some(fingerprint));
    assert_ne!(initial, Some(fingerprint));
}

#[test]
fn full_schedules_need_no_strategy() {
    let len = 50;
    let model = Sequential::new([Layer::dense((1, 2), None)]);
    let trainer = WeightedTrainer::new(GradientDescent::new(0.1), Mse, LrSchedule::constant(0.1));

    let settings = Settings {
        name: "Full".into(),
        schedule: Schedule::Full,
        budget: len,
        greedy: GreedyMode::Lazy,
        batch_size: 10,
        shuffle: false,
        num_epochs: 3,
        seed: 0,
    };
    let data = RunData {
        train: dataset(len),
        valid: None,
        test: None,
    };

    let mut run: Run =
        Controller::new(model, trainer, None, data, Evaluator::new(1, Vec::new()), settings)
            .unwrap();
    let metrics = run.run(&mut RunLog::new(Vec::new())).unwrap();

    assert!(metrics.selections().is_empty());
    assert!(metrics.records().iter().all(|r| r.phase == Phase::Full && r.subset_size == len));
    assert!(run.current_subset().is_none());
}

#[test]
fn reselecting_schedules_need_a_strategy() {
    let model = Sequential::new([Layer::dense((1, 2), None)]);
    let trainer = WeightedTrainer::new(GradientDescent::new(0.1), Mse, LrSchedule::constant(0.1));
    let settings = Settings {
        name: "CRAIG".into(),
        schedule: Schedule::Interval { every: nz(2) },
        budget: 5,
        greedy: GreedyMode::Lazy,
        batch_size: 10,
        shuffle: false,
        num_epochs: 4,
        seed: 0,
    };
    let data = RunData {
        train: dataset(50),
        valid: None,
        test: None,
    };

    let res: coreset::Result<Run> =
        Controller::new(model, trainer, None, data, Evaluator::new(1, Vec::new()), settings);
    assert!(matches!(res, Err(coreset::CoresetErr::InvalidConfig(_))));
}
