use serde::Deserialize;

/// Raw data-subset-selection settings, as written in the run configuration.
///
/// Which of the optional knobs are required depends on `kind`; the adapter enforces it.
#[derive(Debug, Clone, Deserialize)]
pub struct DssConfig {
    /// The strategy name, e.g. `GradMatchPB-Warm`.
    #[serde(rename = "type")]
    pub kind: String,
    pub fraction: f64,
    pub select_every: usize,
    pub kappa: Option<f64>,
    pub lam: Option<f32>,
    pub eps: Option<f32>,
    pub greedy: Option<GreedyConfig>,
    /// Overrides `train_args.seed` when set.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GreedyConfig {
    Lazy,
    Exact,
}
