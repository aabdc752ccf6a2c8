use std::f32::consts::PI;

use ml_core::LrScheduler;

/// Per-epoch learning-rate policies.
///
/// Each variant computes the rate for epoch `t` in closed form from the base rate, so the
/// schedule never drifts from accumulated rounding.
#[derive(Debug, Clone, PartialEq)]
pub enum LrSchedule {
    /// Keeps the base rate forever.
    Constant { base_lr: f32 },

    /// Half-cosine decay from `base_lr` to `eta_min` over `t_max` epochs, then back up,
    /// following the periodic closed form.
    CosineAnnealing {
        base_lr: f32,
        eta_min: f32,
        t_max: usize,
        epoch: usize,
    },

    /// Multiplies the rate by `gamma` every `step_size` epochs.
    Step {
        base_lr: f32,
        step_size: usize,
        gamma: f32,
        epoch: usize,
    },
}

impl LrSchedule {
    pub fn constant(base_lr: f32) -> Self {
        Self::Constant { base_lr }
    }

    pub fn cosine_annealing(base_lr: f32, t_max: usize) -> Self {
        Self::CosineAnnealing {
            base_lr,
            eta_min: 0.,
            t_max,
            epoch: 0,
        }
    }

    pub fn step_decay(base_lr: f32, step_size: usize, gamma: f32) -> Self {
        Self::Step {
            base_lr,
            step_size,
            gamma,
            epoch: 0,
        }
    }

    /// The rate for the current epoch.
    pub fn current(&self) -> f32 {
        match *self {
            Self::Constant { base_lr } => base_lr,
            Self::CosineAnnealing {
                base_lr,
                eta_min,
                t_max,
                epoch,
            } => {
                if t_max == 0 {
                    return base_lr;
                }

                let progress = epoch as f32 / t_max as f32;
                eta_min + (base_lr - eta_min) * (1. + (PI * progress).cos()) / 2.
            }
            Self::Step {
                base_lr,
                step_size,
                gamma,
                epoch,
            } => {
                let steps = epoch.checked_div(step_size).unwrap_or(0);
                base_lr * gamma.powi(steps as i32)
            }
        }
    }
}

impl LrScheduler for LrSchedule {
    fn step(&mut self) -> f32 {
        match self {
            Self::Constant { .. } => {}
            Self::CosineAnnealing { epoch, .. } | Self::Step { epoch, .. } => *epoch += 1,
        }

        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_never_moves() {
        let mut schedule = LrSchedule::constant(0.3);
        assert_eq!(schedule.step(), 0.3);
        assert_eq!(schedule.step(), 0.3);
    }

    #[test]
    fn cosine_reaches_zero_at_t_max() {
        let mut schedule = LrSchedule::cosine_annealing(1., 4);
        let rates: Vec<_> = (0..4).map(|_| schedule.step()).collect();

        assert!((rates[0] - 0.853_553).abs() < 1e-5);
        assert!((rates[1] - 0.5).abs() < 1e-6);
        assert!(rates[3].abs() < 1e-6);
        assert!(rates.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn step_decays_every_step_size() {
        let mut schedule = LrSchedule::step_decay(1., 2, 0.1);
        let rates: Vec<_> = (0..4).map(|_| schedule.step()).collect();

        assert_eq!(rates[0], 1.);
        assert!((rates[1] - 0.1).abs() < 1e-7);
        assert!((rates[2] - 0.1).abs() < 1e-7);
        assert!((rates[3] - 0.01).abs() < 1e-7);
    }
}
