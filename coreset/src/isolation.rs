use log::{error, trace};
use ml_core::{Checkpoint, GreedyMode, Selection, SelectionError, SelectionStrategy};

use crate::{CoresetErr, Result};

/// Runs `strategy` on an independent snapshot of `model` and puts the model back afterwards.
///
/// The model is restored from a cached snapshot whether the strategy succeeds or not, so its
/// trainable state after this call is bit-identical to the state before it. Debug builds
/// re-snapshot after the restore and report any difference.
///
/// # Errors
/// Returns `CoresetErr::StateIsolation` if the restore fails or leaves a different state
/// behind, otherwise the strategy's own error, or `SelectionError::WrongSize` if it returned
/// a subset of the wrong size.
pub fn isolated_select<M, S>(
    model: &mut M,
    strategy: &mut S,
    budget: usize,
    mode: Option<GreedyMode>,
) -> Result<Selection>
where
    M: Checkpoint,
    S: SelectionStrategy<M::State> + ?Sized,
{
    let cached = model.snapshot();
    let clone = model.snapshot();

    let res = strategy.select(budget, clone, mode);

    if let Err(e) = model.restore(&cached) {
        error!("could not restore the model after selection: {e}");
        return Err(CoresetErr::StateIsolation(format!(
            "restore after selection failed: {e}"
        )));
    }

    #[cfg(debug_assertions)]
    if model.snapshot() != cached {
        return Err(CoresetErr::StateIsolation(
            "model state differs from its pre-selection snapshot".into(),
        ));
    }

    trace!(budget = budget, ok = res.is_ok(); "model restored after selection");

    let selection = res?;
    if selection.len() != budget {
        return Err(SelectionError::WrongSize {
            got: selection.len(),
            expected: budget,
        }
        .into());
    }

    Ok(selection)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use ml_core::MlError;

    use super::*;

    /// A model whose whole state is a vector of values.
    #[derive(Debug, Default)]
    struct Params {
        values: Vec<f32>,
        drift: Cell<f32>,
        broken_restore: bool,
    }

    impl Checkpoint for Params {
        type State = Vec<f32>;

        fn snapshot(&self) -> Vec<f32> {
            // A non-zero drift shifts every snapshot by a growing amount.
            let drift = self.drift.get();
            if drift != 0. {
                self.drift.set(drift + 1.);
            }
            self.values.iter().map(|v| v + drift).collect()
        }

        fn restore(&mut self, state: &Vec<f32>) -> std::result::Result<(), MlError> {
            if self.broken_restore {
                return Err(MlError::InvalidInput("restore is broken"));
            }
            self.values.clone_from(state);
            Ok(())
        }
    }

    /// Overwrites the snapshot it gets, then either fails or returns a fixed subset.
    struct Scribbler {
        fail: bool,
        seen: Vec<Vec<f32>>,
    }

    impl SelectionStrategy<Vec<f32>> for Scribbler {
        fn select(
            &mut self,
            budget: usize,
            mut state: Vec<f32>,
            _mode: Option<GreedyMode>,
        ) -> std::result::Result<Selection, SelectionError> {
            self.seen.push(state.clone());
            state.iter_mut().for_each(|v| *v = f32::NAN);

            if self.fail {
                return Err(SelectionError::Optimization("scribbled and failed".into()));
            }
            Selection::uniform((0..budget).collect(), budget, 10)
        }
    }

    fn params() -> Params {
        Params {
            values: vec![1., -2., 3.5],
            ..Default::default()
        }
    }

    fn bits(values: &[f32]) -> Vec<u32> {
        values.iter().map(|v| v.to_bits()).collect()
    }

    #[test]
    fn strategy_sees_the_live_state_and_cannot_touch_it() {
        let mut model = params();
        let mut strategy = Scribbler {
            fail: false,
            seen: Vec::new(),
        };

        let selection = isolated_select(&mut model, &mut strategy, 4, None).unwrap();

        assert_eq!(selection.len(), 4);
        assert_eq!(strategy.seen, [vec![1., -2., 3.5]]);
        assert_eq!(bits(&model.values), bits(&[1., -2., 3.5]));
    }

    #[test]
    fn failing_strategies_still_restore() {
        let mut model = params();
        let mut strategy = Scribbler {
            fail: true,
            seen: Vec::new(),
        };

        let res = isolated_select(&mut model, &mut strategy, 4, None);

        assert!(matches!(
            res,
            Err(CoresetErr::Selection(SelectionError::Optimization(_)))
        ));
        assert_eq!(bits(&model.values), bits(&[1., -2., 3.5]));
    }

    #[test]
    fn broken_restore_is_a_violation() {
        let mut model = Params {
            broken_restore: true,
            ..params()
        };
        let mut strategy = Scribbler {
            fail: false,
            seen: Vec::new(),
        };

        assert!(matches!(
            isolated_select(&mut model, &mut strategy, 4, None),
            Err(CoresetErr::StateIsolation(_))
        ));
    }

    #[cfg(debug_assertions)]
    #[test]
    fn drifting_state_is_caught_in_debug_builds() {
        let mut model = params();
        model.drift.set(1.);
        let mut strategy = Scribbler {
            fail: false,
            seen: Vec::new(),
        };

        assert!(matches!(
            isolated_select(&mut model, &mut strategy, 4, None),
            Err(CoresetErr::StateIsolation(_))
        ));
    }

    #[test]
    fn wrong_sized_results_are_rejected() {
        struct Short;

        impl SelectionStrategy<Vec<f32>> for Short {
            fn select(
                &mut self,
                _budget: usize,
                _state: Vec<f32>,
                _mode: Option<GreedyMode>,
            ) -> std::result::Result<Selection, SelectionError> {
                Selection::uniform(vec![0, 1], 2, 10)
            }
        }

        let mut model = params();
        assert!(matches!(
            isolated_select(&mut model, &mut Short, 3, None),
            Err(CoresetErr::Selection(SelectionError::WrongSize {
                got: 2,
                expected: 3
            }))
        ));
    }
}
