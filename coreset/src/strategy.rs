use std::sync::Arc;

use machine_learning::{
    arch::{ParamSnapshot, Sequential, loss::Loss},
    dataset::InMemoryDataset,
};
use ml_core::{Dataset, GreedyMode, Selection, SelectionError, SelectionStrategy};
use ml_strategies::{Craig, Embedder, Glister, GradMatch, RandomStrategy};

use crate::{CoresetErr, Result, run_spec::Family};

type Data = InMemoryDataset;

/// The selection strategies a run can be configured with.
pub enum Strategy {
    Random(RandomStrategy),
    Glister(Glister<Sequential, Loss, Data>),
    GradMatch(GradMatch<Sequential, Loss, Data>),
    Craig(Craig<Sequential, Loss, Data>),
}

/// The shared pieces a model-based strategy is built from.
pub struct StrategyParts<'a> {
    pub model: &'a Sequential,
    pub loss: Loss,
    pub batch_size: usize,
    pub train: Arc<Data>,
    pub valid: Option<Arc<Data>>,
    /// The step size of validation-driven selection.
    pub eta: f32,
    pub seed: u64,
}

impl Strategy {
    /// Builds the strategy of `family`.
    ///
    /// Full-data training and static random subsets never reselect, so they get `None`.
    ///
    /// # Errors
    /// Returns `CoresetErr::InvalidConfig` if a validation-driven strategy has no
    /// validation split to look at.
    pub fn from_family(family: Family, parts: StrategyParts<'_>) -> Result<Option<Self>> {
        let embedder = || Embedder::new(parts.model.clone(), parts.loss, parts.batch_size);
        let train = Arc::clone(&parts.train);

        let strategy = match family {
            Family::Full | Family::Random { online: false } => return Ok(None),
            Family::Random { online: true } => {
                Strategy::Random(RandomStrategy::online(train.len(), parts.seed))
            }
            Family::Glister => {
                let Some(valid) = parts.valid.clone() else {
                    return Err(CoresetErr::InvalidConfig(
                        "GLISTER needs a validation split".into(),
                    ));
                };
                Strategy::Glister(Glister::new(embedder(), train, valid, parts.eta, parts.seed))
            }
            Family::GradMatch { grouping, lam, eps } => Strategy::GradMatch(GradMatch::new(
                embedder(),
                train,
                grouping,
                lam,
                eps,
                parts.seed,
            )),
            Family::Craig { grouping } => {
                Strategy::Craig(Craig::new(embedder(), train, grouping, parts.seed))
            }
        };

        Ok(Some(strategy))
    }
}

impl SelectionStrategy<ParamSnapshot> for Strategy {
    fn select(
        &mut self,
        budget: usize,
        state: ParamSnapshot,
        mode: Option<GreedyMode>,
    ) -> std::result::Result<Selection, SelectionError> {
        match self {
            Strategy::Random(s) => s.select(budget, state, mode),
            Strategy::Glister(s) => s.select(budget, state, mode),
            Strategy::GradMatch(s) => s.select(budget, state, mode),
            Strategy::Craig(s) => s.select(budget, state, mode),
        }
    }
}
