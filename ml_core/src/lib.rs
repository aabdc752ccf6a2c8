mod checkpoint;
mod data;
mod error;
mod loss;
mod model;
mod optimizer;
mod selection;
mod stats;
mod strategy;

pub use checkpoint::Checkpoint;
pub use data::{Batch, DataError, Dataset};
pub use error::{MlError, SelectionError};
pub use loss::LossFn;
pub use model::Model;
pub use optimizer::{LrScheduler, Optimizer};
pub use selection::Selection;
pub use stats::{BatchStats, argmax_matches};
pub use strategy::{GreedyMode, SelectionStrategy};
