use std::{cell::RefCell, fs::File, io::BufReader, rc::Rc, sync::Arc};

use log::info;
use machine_learning::{
    arch::{Sequential, layers::Layer, loss::Loss},
    dataset::{InMemoryDataset, blobs, from_rows, read_csv},
    initialization::{ChainedParamGen, ConstParamGen, ParamGen, RandParamGen},
    optimization::{Adam, GradientDescent, GradientDescentWithMomentum, Optim},
};
use ml_core::Dataset;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    CoresetErr, Result,
    configs::{DataSourceConfig, OptimizerConfig, ParamGenConfig},
    controller::{Controller, RunData, Settings},
    eval::Evaluator,
    run_spec::{DataSpec, LayerSpec, RunSpec},
    strategy::{Strategy, StrategyParts},
    trainer::WeightedTrainer,
};

/// The controller every configured run resolves to.
pub type Run = Controller<Sequential, Optim, Loss, InMemoryDataset, Strategy>;

/// Resolves the parameter generator of one layer and hands it, boxed, to `callback`.
///
/// # Arguments
/// * `rng` - The shared random number generator.
/// * `init` - The layer's `ParamGenConfig`.
/// * `limit` - The amount of parameters of the layer.
/// * `fan_in` - The layer's input size.
/// * `fan_out` - The layer's output size.
/// * `callback` - The closure to call passing in the boxed generator.
macro_rules! with_init {
    ($rng:expr, $init:expr, $limit:expr, $fan_in:expr, $fan_out:expr, $callback:expr) => {
        match $init {
            ParamGenConfig::Const { value } => ($callback)(Box::new(ConstParamGen::new(value, $limit))),
            ParamGenConfig::Uniform { low, high } => {
                let param_gen = RandParamGen::uniform($rng, $limit, low, high)?;
                ($callback)(Box::new(param_gen))
            }
            ParamGenConfig::XavierUniform => {
                let param_gen = RandParamGen::xavier_uniform($rng, $limit, $fan_in, $fan_out)?;
                ($callback)(Box::new(param_gen))
            }
            ParamGenConfig::LecunUniform => {
                let param_gen = RandParamGen::lecun_uniform($rng, $limit, $fan_in)?;
                ($callback)(Box::new(param_gen))
            }
            ParamGenConfig::Normal { mean, std_dev } => {
                let param_gen = RandParamGen::normal($rng, $limit, mean, std_dev)?;
                ($callback)(Box::new(param_gen))
            }
            ParamGenConfig::Kaiming => {
                let param_gen = RandParamGen::kaiming($rng, $limit, $fan_in)?;
                ($callback)(Box::new(param_gen))
            }
            ParamGenConfig::Xavier => {
                let param_gen = RandParamGen::xavier($rng, $limit, $fan_in, $fan_out)?;
                ($callback)(Box::new(param_gen))
            }
        }
    };
}

/// Builds a ready to run `Controller` from a validated `RunSpec`.
#[derive(Debug, Default)]
pub struct RunBuilder;

impl RunBuilder {
    /// Creates a new `RunBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a run following a `RunSpec`.
    ///
    /// Every source of randomness is derived from the run seed, so two builds of the same
    /// `RunSpec` train identically.
    ///
    /// # Errors
    /// Any failure loading the dataset, a budget that doesn't fit the training split or
    /// invalid initializer parameters.
    pub fn build(&self, spec: RunSpec) -> Result<Run> {
        let mut rng = StdRng::seed_from_u64(spec.train.seed);

        let data = self.resolve_data(&spec.data, &mut rng)?;
        let len = data.train.len();
        let budget = budget(spec.strategy.fraction, len)?;

        let model_rng = Rc::new(RefCell::new(StdRng::seed_from_u64(rng.random())));
        let model = self.resolve_model(&spec.layers, model_rng)?;

        let optimizer = self.resolve_optimizer(spec.optimizer, model.layout().total());
        let trainer = WeightedTrainer::new(optimizer, spec.loss, spec.lr_schedule);

        let strategy = Strategy::from_family(
            spec.strategy.family,
            StrategyParts {
                model: &model,
                loss: spec.loss,
                batch_size: spec.data.batch_size,
                train: Arc::clone(&data.train),
                valid: data.valid.clone(),
                eta: spec.optimizer.lr(),
                seed: rng.random(),
            },
        )?;

        let evaluator = Evaluator::new(spec.train.print_every, spec.train.print_args);
        let settings = Settings {
            name: spec.strategy.name,
            schedule: spec.schedule,
            budget,
            greedy: spec.strategy.greedy,
            batch_size: spec.data.batch_size,
            shuffle: spec.data.shuffle,
            num_epochs: spec.train.num_epochs,
            seed: rng.random(),
        };

        Controller::new(model, trainer, strategy, data, evaluator, settings)
    }

    /// Loads the dataset and carves the validation and test splits out of it.
    fn resolve_data<R: Rng>(&self, spec: &DataSpec, rng: &mut R) -> Result<RunData<InMemoryDataset>> {
        let dataset = match spec.source {
            DataSourceConfig::Inline {
                ref data,
                x_size,
                y_size,
            } => from_rows(data, x_size, y_size)?,
            DataSourceConfig::Csv {
                ref path,
                x_size,
                y_size,
            } => read_csv(BufReader::new(File::open(path)?), x_size, y_size)?,
            DataSourceConfig::Blobs {
                samples,
                features,
                classes,
                spread,
            } => blobs(samples, features, classes, spread, rng)?,
        };

        let splits = dataset.split(spec.valid_fraction, spec.test_fraction, rng)?;
        info!(
            "dataset {}: {} train, {} valid, {} test samples",
            spec.name,
            splits.train.len(),
            splits.valid.as_ref().map_or(0, InMemoryDataset::len),
            splits.test.as_ref().map_or(0, InMemoryDataset::len),
        );

        Ok(RunData {
            train: Arc::new(splits.train),
            valid: splits.valid.map(Arc::new),
            test: splits.test.map(Arc::new),
        })
    }

    /// Resolves the model and draws its initial parameters, one generator per layer.
    fn resolve_model<R>(&self, layers: &[LayerSpec], rng: Rc<RefCell<R>>) -> Result<Sequential>
    where
        R: Rng + 'static,
    {
        let mut param_gens: Vec<Box<dyn ParamGen>> = Vec::with_capacity(layers.len());

        for layer in layers {
            let (fan_in, fan_out) = layer.dim;
            let limit = (fan_in + 1) * fan_out;

            with_init!(rng.clone(), layer.init, limit, fan_in, fan_out, |param_gen| {
                param_gens.push(param_gen)
            });
        }

        let mut model = Sequential::new(layers.iter().map(|l| Layer::dense(l.dim, l.act_fn)));
        model.initialize(&mut ChainedParamGen::new(param_gens))?;
        Ok(model)
    }

    /// Resolves the optimizer for a model of `len` parameters.
    fn resolve_optimizer(&self, spec: OptimizerConfig, len: usize) -> Optim {
        match spec {
            OptimizerConfig::Sgd {
                lr,
                momentum,
                weight_decay,
                nesterov,
            } => {
                if momentum == 0. && weight_decay == 0. {
                    return Optim::GradientDescent(GradientDescent::new(lr));
                }

                let optimizer = GradientDescentWithMomentum::new(len, lr, momentum)
                    .with_weight_decay(weight_decay)
                    .with_nesterov(nesterov);
                Optim::GradientDescentWithMomentum(optimizer)
            }
            OptimizerConfig::Adam { lr, b1, b2, eps } => Optim::Adam(Adam::new(len, lr, b1, b2, eps)),
        }
    }
}

/// `floor(fraction * len)`, which must be in `[1, len]`.
pub fn budget(fraction: f64, len: usize) -> Result<usize> {
    let budget = (fraction * len as f64).floor() as usize;

    if budget == 0 || budget > len {
        return Err(CoresetErr::InvalidConfig(format!(
            "fraction {fraction} of {len} training samples gives a budget of {budget}"
        )));
    }

    Ok(budget)
}
