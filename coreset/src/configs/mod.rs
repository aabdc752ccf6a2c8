//! The JSON run configuration and its validation into a `RunSpec`.

mod adapter;
mod dss;
mod model;
mod training;

use std::{fs::File, io::BufReader, path::Path};

use serde::Deserialize;

pub use adapter::Adapter;
pub use dss::{DssConfig, GreedyConfig};
pub use model::{ActFnConfig, LayerConfig, ModelConfig, ParamGenConfig};
pub use training::{
    DataLoaderConfig, DataSourceConfig, DatasetConfig, LossConfig, OptimizerConfig, PrintArg,
    SchedulerConfig, TrainArgs,
};

use crate::Result;

/// Everything a run is configured with. Every section is required.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub dss_strategy: DssConfig,
    pub dataset: DatasetConfig,
    pub dataloader: DataLoaderConfig,
    pub model: ModelConfig,
    pub loss: LossConfig,
    pub optimizer: OptimizerConfig,
    pub scheduler: SchedulerConfig,
    pub train_args: TrainArgs,
}

impl RunConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Schedule;

    #[test]
    fn demo_configs_are_valid() {
        for json in [
            include_str!("../../../demos/blobs_craigpb_warm.json"),
            include_str!("../../../demos/blobs_gradmatch.json"),
        ] {
            let config = RunConfig::from_json(json).unwrap();
            let spec = Adapter::new().adapt(config).unwrap();
            assert_ne!(spec.schedule, Schedule::Full);
        }
    }

    #[test]
    fn sections_are_required() {
        let res = RunConfig::from_json(r#"{ "dss_strategy": { "type": "Full" } }"#);
        assert!(matches!(res, Err(crate::CoresetErr::Json(_))));
    }
}
