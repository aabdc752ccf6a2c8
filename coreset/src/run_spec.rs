use std::path::PathBuf;

use machine_learning::{
    arch::{activations::ActFn, loss::Loss},
    optimization::LrSchedule,
};
use ml_core::GreedyMode;
use ml_strategies::Grouping;

use crate::{
    configs::{DataSourceConfig, OptimizerConfig, ParamGenConfig, PrintArg},
    schedule::Schedule,
};

/// The selection algorithm family of a run, with its validated parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Family {
    Full,
    Random { online: bool },
    Glister,
    GradMatch { grouping: Grouping, lam: f32, eps: f32 },
    Craig { grouping: Grouping },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategySpec {
    /// The configured name, used for logs and the results path.
    pub name: String,
    pub family: Family,
    pub fraction: f64,
    pub select_every: usize,
    pub greedy: GreedyMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataSpec {
    pub name: String,
    pub source: DataSourceConfig,
    pub valid_fraction: f64,
    pub test_fraction: f64,
    pub batch_size: usize,
    pub shuffle: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub dim: (usize, usize),
    pub act_fn: Option<ActFn>,
    pub init: ParamGenConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainSpec {
    pub num_epochs: usize,
    pub print_every: usize,
    pub print_args: Vec<PrintArg>,
    pub results_dir: PathBuf,
    pub seed: u64,
}

/// A validated, immutable description of a whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSpec {
    pub strategy: StrategySpec,
    pub schedule: Schedule,
    pub data: DataSpec,
    pub layers: Vec<LayerSpec>,
    pub loss: Loss,
    pub optimizer: OptimizerConfig,
    pub lr_schedule: LrSchedule,
    pub train: TrainSpec,
}
