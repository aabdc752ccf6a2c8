use std::num::NonZeroUsize;

use crate::{CoresetErr, Result};

/// Which samples an epoch trains on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Every training sample, unweighted.
    Full,
    /// The current subset, weighted by its gammas.
    Subset,
}

/// What the controller does during one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochPlan {
    /// Whether a new subset is selected before training.
    pub select: bool,
    pub phase: Phase,
}

/// Decides, per epoch, whether to reselect and which phase applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Full-data training every epoch, no selection.
    Full,
    /// The initial subset is kept for the whole run.
    Static,
    /// A new subset at the start of every epoch.
    EveryEpoch,
    /// Reselects when `(epoch + 1) % every == 0`.
    Interval { every: NonZeroUsize },
    /// Trains on the full data for `full_epochs` epochs, then reselects when
    /// `epoch >= kappa_epochs && epoch % every == 0`.
    WarmInterval {
        every: NonZeroUsize,
        kappa_epochs: usize,
        full_epochs: usize,
    },
}

impl Schedule {
    /// Creates a warm-start interval schedule.
    ///
    /// `kappa_epochs = floor(kappa * num_epochs)` and
    /// `full_epochs = floor(kappa_epochs / floor(fraction * 100))`.
    ///
    /// # Errors
    /// Returns `CoresetErr::InvalidConfig` if `kappa` is outside `[0, 1]`, if
    /// `floor(fraction * 100)` is zero or if the thresholds are not ordered as
    /// `full_epochs <= kappa_epochs <= num_epochs`.
    pub fn warm(every: NonZeroUsize, kappa: f64, fraction: f64, num_epochs: usize) -> Result<Self> {
        if !(0.0..=1.0).contains(&kappa) {
            return Err(CoresetErr::InvalidConfig(format!(
                "kappa ({kappa}) must be in [0, 1]"
            )));
        }

        let percent = (fraction * 100.).floor() as usize;
        if percent == 0 {
            return Err(CoresetErr::InvalidConfig(format!(
                "fraction ({fraction}) is too small for a warm start, floor(fraction * 100) is 0"
            )));
        }

        let kappa_epochs = (kappa * num_epochs as f64).floor() as usize;
        let full_epochs = kappa_epochs / percent;

        if full_epochs > kappa_epochs || kappa_epochs > num_epochs {
            return Err(CoresetErr::InvalidConfig(format!(
                "warm start thresholds out of order: full_epochs={full_epochs}, \
                 kappa_epochs={kappa_epochs}, num_epochs={num_epochs}"
            )));
        }

        Ok(Self::WarmInterval {
            every,
            kappa_epochs,
            full_epochs,
        })
    }

    /// Returns what happens during `epoch`, counted from zero.
    pub fn plan(&self, epoch: usize) -> EpochPlan {
        let subset = |select| EpochPlan {
            select,
            phase: Phase::Subset,
        };

        match *self {
            Schedule::Full => EpochPlan {
                select: false,
                phase: Phase::Full,
            },
            Schedule::Static => subset(false),
            Schedule::EveryEpoch => subset(true),
            Schedule::Interval { every } => subset((epoch + 1) % every.get() == 0),
            Schedule::WarmInterval {
                every,
                kappa_epochs,
                full_epochs,
            } => {
                if epoch < full_epochs {
                    EpochPlan {
                        select: false,
                        phase: Phase::Full,
                    }
                } else {
                    subset(epoch >= kappa_epochs && epoch % every.get() == 0)
                }
            }
        }
    }

    /// Whether the run needs a random subset before its first selection.
    pub fn uses_subsets(&self) -> bool {
        !matches!(self, Schedule::Full)
    }
}
