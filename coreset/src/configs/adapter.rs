use std::num::NonZeroUsize;

use log::debug;
use machine_learning::{
    arch::{
        activations::ActFn,
        loss::{CrossEntropy, Loss, Mse},
    },
    optimization::LrSchedule,
};
use ml_core::GreedyMode;
use ml_strategies::Grouping;

use super::{
    ActFnConfig, DataSourceConfig, DatasetConfig, DssConfig, GreedyConfig, LayerConfig,
    LossConfig, ModelConfig, OptimizerConfig, ParamGenConfig, PrintArg, RunConfig,
    SchedulerConfig, TrainArgs,
};
use crate::{
    CoresetErr, Result,
    run_spec::{DataSpec, Family, LayerSpec, RunSpec, StrategySpec, TrainSpec},
    schedule::Schedule,
};

/// Validates a `RunConfig` and turns it into an immutable `RunSpec`.
///
/// Every check that doesn't need the data loaded happens here, so a bad configuration fails
/// before any work is done.
#[derive(Debug, Default)]
pub struct Adapter;

fn invalid<T>(msg: impl Into<String>) -> Result<T> {
    Err(CoresetErr::InvalidConfig(msg.into()))
}

impl Adapter {
    pub fn new() -> Self {
        Self
    }

    pub fn adapt(&self, config: RunConfig) -> Result<RunSpec> {
        let RunConfig {
            dss_strategy,
            dataset,
            dataloader,
            model,
            loss,
            optimizer,
            scheduler,
            train_args,
        } = config;

        self.validate_model(&model)?;
        self.validate_dataset(&dataset, &model)?;
        self.validate_optimizer(&optimizer)?;
        self.validate_train_args(&train_args, &dataset)?;

        let num_epochs = train_args.num_epochs.get();
        let batch_size = dataloader.batch_size.get();
        let (strategy, schedule) =
            self.adapt_strategy(&dss_strategy, batch_size, num_epochs, &dataset)?;

        debug!(strategy = strategy.name.as_str(), schedule:? = schedule; "configuration validated");

        Ok(RunSpec {
            strategy,
            schedule,
            data: DataSpec {
                name: dataset.name,
                source: dataset.source,
                valid_fraction: dataset.valid_fraction,
                test_fraction: dataset.test_fraction,
                batch_size,
                shuffle: dataloader.shuffle,
            },
            layers: self.adapt_model(&model),
            loss: self.adapt_loss(loss),
            lr_schedule: self.adapt_scheduler(scheduler, optimizer.lr())?,
            optimizer,
            train: TrainSpec {
                num_epochs,
                print_every: train_args.print_every.get(),
                print_args: train_args.print_args,
                results_dir: train_args.results_dir,
                seed: dss_strategy
                    .seed
                    .or(train_args.seed)
                    .unwrap_or_else(rand::random),
            },
        })
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    fn validate_model(&self, model: &ModelConfig) -> Result<()> {
        let ModelConfig::Sequential { layers } = model;

        if layers.is_empty() {
            return invalid("model must have at least one layer");
        }

        for (i, layer) in layers.iter().enumerate() {
            let LayerConfig::Dense { dim: (n, m), init, .. } = *layer;
            if n == 0 || m == 0 {
                return invalid(format!("layer {i}: dimensions must be positive"));
            }

            match init {
                ParamGenConfig::Uniform { low, high } if !(low < high) => {
                    return invalid(format!("layer {i}: uniform init needs low < high"));
                }
                ParamGenConfig::Normal { std_dev, .. } if !(std_dev >= 0.) => {
                    return invalid(format!("layer {i}: normal init needs std_dev >= 0"));
                }
                _ => {}
            }
        }

        // Adjacent layers must have compatible dimensions: prev.m == next.n
        for i in 1..layers.len() {
            let (_, prev_m) = layer_dim(&layers[i - 1]);
            let (curr_n, _) = layer_dim(&layers[i]);
            if prev_m != curr_n {
                return invalid(format!(
                    "layer {i}: input size ({curr_n}) does not match \
                     previous layer output size ({prev_m})"
                ));
            }
        }

        Ok(())
    }

    fn validate_dataset(&self, dataset: &DatasetConfig, model: &ModelConfig) -> Result<()> {
        let split_range = 0.0..1.0;
        if !split_range.contains(&dataset.valid_fraction)
            || !split_range.contains(&dataset.test_fraction)
            || dataset.valid_fraction + dataset.test_fraction >= 1.
        {
            return invalid(format!(
                "valid_fraction ({}) and test_fraction ({}) must be in [0, 1) and leave \
                 training samples",
                dataset.valid_fraction, dataset.test_fraction
            ));
        }

        let (x_size, y_size) = match &dataset.source {
            DataSourceConfig::Inline { data, x_size, y_size } => {
                let row_size = x_size + y_size;
                if *x_size == 0 || *y_size == 0 {
                    return invalid("x_size and y_size must be greater than 0");
                }
                if data.is_empty() || data.len() % row_size != 0 {
                    return invalid(format!(
                        "dataset length ({}) is not a positive multiple of x_size + y_size \
                         ({row_size})",
                        data.len()
                    ));
                }
                (*x_size, *y_size)
            }
            DataSourceConfig::Csv { x_size, y_size, .. } => {
                if *x_size == 0 || *y_size == 0 {
                    return invalid("x_size and y_size must be greater than 0");
                }
                (*x_size, *y_size)
            }
            DataSourceConfig::Blobs {
                samples,
                features,
                classes,
                spread,
            } => {
                if *samples == 0 || *features == 0 || *classes == 0 {
                    return invalid("blobs sizes must be greater than 0");
                }
                if !(*spread > 0.) || !spread.is_finite() {
                    return invalid(format!("blobs spread ({spread}) must be positive"));
                }
                (*features, *classes)
            }
        };

        let ModelConfig::Sequential { layers } = model;
        let input = layers.first().map(|l| layer_dim(l).0);
        let output = layers.last().map(|l| layer_dim(l).1);

        if input != Some(x_size) || output != Some(y_size) {
            return invalid(format!(
                "model maps {input:?} inputs to {output:?} outputs but the dataset has \
                 {x_size} inputs and {y_size} targets"
            ));
        }

        Ok(())
    }

    fn validate_optimizer(&self, optimizer: &OptimizerConfig) -> Result<()> {
        let lr = optimizer.lr();
        if !(lr > 0.) || !lr.is_finite() {
            return invalid(format!("learning rate ({lr}) must be positive"));
        }

        match *optimizer {
            OptimizerConfig::Sgd {
                momentum,
                weight_decay,
                nesterov,
                ..
            } => {
                if !(0.0..1.0).contains(&momentum) {
                    return invalid(format!("momentum ({momentum}) must be in [0, 1)"));
                }
                if !(weight_decay >= 0.) {
                    return invalid(format!("weight_decay ({weight_decay}) must be >= 0"));
                }
                if nesterov && momentum == 0. {
                    return invalid("nesterov momentum requires momentum > 0");
                }
            }
            OptimizerConfig::Adam { b1, b2, eps, .. } => {
                if !(0.0..1.0).contains(&b1) || !(0.0..1.0).contains(&b2) {
                    return invalid(format!("adam betas ({b1}, {b2}) must be in [0, 1)"));
                }
                if !(eps > 0.) {
                    return invalid(format!("adam eps ({eps}) must be positive"));
                }
            }
        }

        Ok(())
    }

    fn validate_train_args(&self, train_args: &TrainArgs, dataset: &DatasetConfig) -> Result<()> {
        for arg in &train_args.print_args {
            let missing = match arg {
                PrintArg::ValLoss | PrintArg::ValAcc => dataset.valid_fraction == 0.,
                PrintArg::TstLoss | PrintArg::TstAcc => dataset.test_fraction == 0.,
                _ => false,
            };

            if missing {
                return invalid(format!(
                    "print_args requests {arg:?} but the dataset has no such split"
                ));
            }
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Adaptation
    // -------------------------------------------------------------------------

    fn adapt_strategy(
        &self,
        dss: &DssConfig,
        batch_size: usize,
        num_epochs: usize,
        dataset: &DatasetConfig,
    ) -> Result<(StrategySpec, Schedule)> {
        let fraction = dss.fraction;
        if !(fraction > 0. && fraction <= 1.) {
            return invalid(format!("fraction ({fraction}) must be in (0, 1]"));
        }

        let Some(every) = NonZeroUsize::new(dss.select_every) else {
            return invalid("select_every must be greater than 0");
        };

        let (base, warm) = match dss.kind.strip_suffix("-Warm") {
            Some(base) => (base, true),
            None => (dss.kind.as_str(), false),
        };

        let per_batch = Grouping::PerBatch { batch_size };
        let family = match base {
            "Full" if !warm => Family::Full,
            "Random" if !warm => Family::Random { online: false },
            "Random-Online" if !warm => Family::Random { online: true },
            "GLISTER" => Family::Glister,
            "GradMatch" | "GradMatchPB" => {
                let (Some(lam), Some(eps)) = (dss.lam, dss.eps) else {
                    return invalid(format!("{} requires both lam and eps", dss.kind));
                };
                if !(lam >= 0.) || !(eps >= 0.) {
                    return invalid(format!("lam ({lam}) and eps ({eps}) must be >= 0"));
                }

                let grouping = match base {
                    "GradMatchPB" => per_batch,
                    _ => Grouping::PerClass,
                };
                Family::GradMatch { grouping, lam, eps }
            }
            "CRAIG" => Family::Craig {
                grouping: Grouping::PerClass,
            },
            "CRAIGPB" => Family::Craig {
                grouping: per_batch,
            },
            _ => return invalid(format!("unknown strategy type '{}'", dss.kind)),
        };

        if family == Family::Glister && dataset.valid_fraction == 0. {
            return invalid(format!("{} requires a validation split", dss.kind));
        }

        let schedule = match family {
            Family::Full => Schedule::Full,
            Family::Random { online: false } => Schedule::Static,
            Family::Random { online: true } => Schedule::EveryEpoch,
            _ if warm => {
                let Some(kappa) = dss.kappa else {
                    return invalid(format!("{} requires kappa", dss.kind));
                };
                Schedule::warm(every, kappa, fraction, num_epochs)?
            }
            _ => Schedule::Interval { every },
        };

        let greedy = match dss.greedy {
            Some(GreedyConfig::Exact) => GreedyMode::Exact,
            Some(GreedyConfig::Lazy) | None => GreedyMode::Lazy,
        };

        let strategy = StrategySpec {
            name: dss.kind.clone(),
            family,
            fraction,
            select_every: every.get(),
            greedy,
        };

        Ok((strategy, schedule))
    }

    fn adapt_model(&self, model: &ModelConfig) -> Vec<LayerSpec> {
        let ModelConfig::Sequential { layers } = model;

        layers
            .iter()
            .map(|layer| match *layer {
                LayerConfig::Dense { dim, init, act_fn } => LayerSpec {
                    dim,
                    act_fn: act_fn.map(|act_fn| self.adapt_act_fn(act_fn)),
                    init,
                },
            })
            .collect()
    }

    fn adapt_act_fn(&self, act_fn: ActFnConfig) -> ActFn {
        match act_fn {
            ActFnConfig::Sigmoid { amp } => ActFn::sigmoid(amp),
            ActFnConfig::Relu => ActFn::relu(),
            ActFnConfig::Tanh => ActFn::tanh(),
        }
    }

    fn adapt_loss(&self, loss: LossConfig) -> Loss {
        match loss {
            LossConfig::Mse => Loss::Mse(Mse::new()),
            LossConfig::CrossEntropy => Loss::CrossEntropy(CrossEntropy::new()),
        }
    }

    fn adapt_scheduler(&self, scheduler: SchedulerConfig, lr: f32) -> Result<LrSchedule> {
        match scheduler {
            SchedulerConfig::Constant => Ok(LrSchedule::constant(lr)),
            SchedulerConfig::CosineAnnealing { t_max } if t_max > 0 => {
                Ok(LrSchedule::cosine_annealing(lr, t_max))
            }
            SchedulerConfig::Step { step_size, gamma } if step_size > 0 && gamma > 0. => {
                Ok(LrSchedule::step_decay(lr, step_size, gamma))
            }
            other => invalid(format!("invalid scheduler parameters: {other:?}")),
        }
    }
}

fn layer_dim(layer: &LayerConfig) -> (usize, usize) {
    match *layer {
        LayerConfig::Dense { dim, .. } => dim,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config(dss: serde_json::Value) -> serde_json::Value {
        json!({
            "dss_strategy": dss,
            "dataset": {
                "name": "blobs",
                "source": { "blobs": { "samples": 200, "features": 2, "classes": 3, "spread": 1.0 } },
                "valid_fraction": 0.1,
                "test_fraction": 0.1
            },
            "dataloader": { "batch_size": 20, "shuffle": false },
            "model": { "sequential": { "layers": [
                { "dense": { "dim": [2, 8], "init": "xavier_uniform", "act_fn": "relu" } },
                { "dense": { "dim": [8, 3], "init": { "const": { "value": 0.0 } }, "act_fn": null } }
            ] } },
            "loss": "cross_entropy",
            "optimizer": { "sgd": { "lr": 0.05, "momentum": 0.9, "weight_decay": 5e-4, "nesterov": true } },
            "scheduler": { "cosine_annealing": { "t_max": 30 } },
            "train_args": {
                "num_epochs": 30,
                "print_every": 5,
                "results_dir": "results",
                "print_args": ["val_loss", "val_acc", "tst_acc", "time"],
                "seed": 7
            }
        })
    }

    fn adapt(value: serde_json::Value) -> Result<RunSpec> {
        let config: RunConfig = serde_json::from_value(value)?;
        Adapter::new().adapt(config)
    }

    fn assert_invalid(value: serde_json::Value) {
        let res = adapt(value);
        assert!(
            matches!(res, Err(CoresetErr::InvalidConfig(_))),
            "expected a configuration error, got {res:?}"
        );
    }

    #[test]
    fn adapts_a_warm_per_batch_strategy() {
        let spec = adapt(config(json!({
            "type": "GradMatchPB-Warm",
            "fraction": 0.1,
            "select_every": 5,
            "kappa": 0.5,
            "lam": 0.5,
            "eps": 0.0
        })))
        .unwrap();

        assert_eq!(
            spec.strategy.family,
            Family::GradMatch {
                grouping: Grouping::PerBatch { batch_size: 20 },
                lam: 0.5,
                eps: 0.,
            }
        );
        assert_eq!(
            spec.schedule,
            Schedule::WarmInterval {
                every: NonZeroUsize::new(5).unwrap(),
                kappa_epochs: 15,
                full_epochs: 1,
            }
        );
        assert_eq!(spec.strategy.greedy, GreedyMode::Lazy);
        assert_eq!(spec.train.seed, 7);
        assert_eq!(spec.layers.len(), 2);
    }

    #[test]
    fn strategy_seed_takes_precedence() {
        let dss = json!({ "type": "Random-Online", "fraction": 0.1, "select_every": 1, "seed": 5 });

        let spec = adapt(config(dss.clone())).unwrap();
        assert_eq!(spec.train.seed, 5);

        let mut value = config(dss);
        value["train_args"].as_object_mut().unwrap().remove("seed");
        assert_eq!(adapt(value).unwrap().train.seed, 5);
    }

    #[test]
    fn maps_every_family_to_its_schedule() {
        let every = NonZeroUsize::new(3).unwrap();
        let cases = [
            ("Full", Schedule::Full),
            ("Random", Schedule::Static),
            ("Random-Online", Schedule::EveryEpoch),
            ("GLISTER", Schedule::Interval { every }),
            ("CRAIG", Schedule::Interval { every }),
            ("CRAIGPB", Schedule::Interval { every }),
        ];

        for (kind, schedule) in cases {
            let spec = adapt(config(json!({
                "type": kind,
                "fraction": 0.2,
                "select_every": 3,
                "greedy": "exact"
            })))
            .unwrap();

            assert_eq!(spec.schedule, schedule, "{kind}");
        }
    }

    #[test]
    fn rejects_unknown_strategies() {
        assert_invalid(config(json!({ "type": "KCenter", "fraction": 0.1, "select_every": 5 })));
        assert_invalid(config(json!({ "type": "Random-Warm", "fraction": 0.1, "select_every": 5 })));
    }

    #[test]
    fn warm_variants_require_kappa() {
        assert_invalid(config(json!({ "type": "CRAIG-Warm", "fraction": 0.1, "select_every": 5 })));
    }

    #[test]
    fn gradmatch_requires_its_knobs() {
        assert_invalid(config(json!({
            "type": "GradMatch",
            "fraction": 0.1,
            "select_every": 5,
            "lam": 0.5
        })));
    }

    #[test]
    fn rejects_bad_fractions_and_intervals() {
        assert_invalid(config(json!({ "type": "CRAIG", "fraction": 0.0, "select_every": 5 })));
        assert_invalid(config(json!({ "type": "CRAIG", "fraction": 1.5, "select_every": 5 })));
        assert_invalid(config(json!({ "type": "CRAIG", "fraction": 0.1, "select_every": 0 })));
        assert_invalid(config(json!({
            "type": "GLISTER-Warm",
            "fraction": 0.005,
            "select_every": 5,
            "kappa": 0.5
        })));
    }

    #[test]
    fn rejects_mismatched_model_and_dataset() {
        let mut value = config(json!({ "type": "Random", "fraction": 0.1, "select_every": 5 }));
        value["dataset"]["source"]["blobs"]["features"] = json!(4);
        assert_invalid(value);
    }

    #[test]
    fn rejects_incompatible_layers() {
        let mut value = config(json!({ "type": "Random", "fraction": 0.1, "select_every": 5 }));
        value["model"]["sequential"]["layers"][1]["dense"]["dim"] = json!([7, 3]);
        assert_invalid(value);
    }

    #[test]
    fn rejects_evaluation_of_missing_splits() {
        let mut value = config(json!({ "type": "Random", "fraction": 0.1, "select_every": 5 }));
        value["dataset"]["test_fraction"] = json!(0.0);
        assert_invalid(value);
    }

    #[test]
    fn glister_requires_a_validation_split() {
        let mut value = config(json!({ "type": "GLISTER", "fraction": 0.1, "select_every": 5 }));
        value["dataset"]["valid_fraction"] = json!(0.0);
        value["train_args"]["print_args"] = json!(["tst_acc"]);
        assert_invalid(value);
    }

    #[test]
    fn rejects_nesterov_without_momentum() {
        let mut value = config(json!({ "type": "Random", "fraction": 0.1, "select_every": 5 }));
        value["optimizer"]["sgd"]["momentum"] = json!(0.0);
        assert_invalid(value);
    }

    #[test]
    fn missing_knobs_are_fatal() {
        let mut value = config(json!({ "type": "Random", "fraction": 0.1, "select_every": 5 }));
        value["train_args"]
            .as_object_mut()
            .unwrap()
            .remove("num_epochs");

        assert!(matches!(adapt(value), Err(CoresetErr::Json(_))));
    }
}
