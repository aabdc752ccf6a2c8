use std::{num::NonZeroUsize, path::PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossConfig {
    Mse,
    CrossEntropy,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerConfig {
    Sgd {
        lr: f32,
        momentum: f32,
        weight_decay: f32,
        nesterov: bool,
    },
    Adam {
        lr: f32,
        b1: f32,
        b2: f32,
        eps: f32,
    },
}

impl OptimizerConfig {
    pub fn lr(&self) -> f32 {
        match *self {
            OptimizerConfig::Sgd { lr, .. } | OptimizerConfig::Adam { lr, .. } => lr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerConfig {
    Constant,
    CosineAnnealing { t_max: usize },
    Step { step_size: usize, gamma: f32 },
}

/// Where the samples of a run come from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceConfig {
    /// Flat rows of `x_size` inputs followed by `y_size` targets.
    Inline {
        data: Vec<f32>,
        x_size: usize,
        y_size: usize,
    },
    /// A comma separated file with one sample per line, laid out like `Inline` rows.
    Csv {
        path: PathBuf,
        x_size: usize,
        y_size: usize,
    },
    /// Gaussian blobs with one-hot targets, one blob per class.
    Blobs {
        samples: usize,
        features: usize,
        classes: usize,
        spread: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    pub source: DataSourceConfig,
    pub valid_fraction: f64,
    pub test_fraction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DataLoaderConfig {
    pub batch_size: NonZeroUsize,
    pub shuffle: bool,
}

/// A metric the periodic evaluation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintArg {
    TrnLoss,
    TrnAcc,
    ValLoss,
    ValAcc,
    TstLoss,
    TstAcc,
    #[serde(alias = "subtrn_losses")]
    SubtrnLoss,
    SubtrnAcc,
    Time,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrainArgs {
    pub num_epochs: NonZeroUsize,
    pub print_every: NonZeroUsize,
    pub results_dir: PathBuf,
    pub print_args: Vec<PrintArg>,
    pub seed: Option<u64>,
}
