use ml_core::Optimizer;

use crate::{Result, error::ensure_len};

/// Stochastic gradient descent with momentum, optional Nesterov look-ahead and L2 weight decay.
#[derive(Debug, Clone)]
pub struct GradientDescentWithMomentum {
    learning_rate: f32,
    momentum: f32,
    weight_decay: f32,
    nesterov: bool,
    velocity: Box<[f32]>,
}

impl GradientDescentWithMomentum {
    /// Creates a new `GradientDescentWithMomentum` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `momentum` - Hyperparameter to the optimization algorithm.
    ///
    /// # Returns
    /// A new `GradientDescentWithMomentum` instance.
    pub fn new(len: usize, learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            weight_decay: 0.,
            nesterov: false,
            velocity: vec![0.; len].into_boxed_slice(),
        }
    }

    /// Adds `weight_decay * p` to every gradient entry before the momentum update.
    pub fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    pub fn with_nesterov(mut self, nesterov: bool) -> Self {
        self.nesterov = nesterov;
        self
    }
}

impl Optimizer for GradientDescentWithMomentum {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        ensure_len("gradient", grad.len(), params.len())?;
        ensure_len("velocity", self.velocity.len(), params.len())?;

        let lr = self.learning_rate;
        let mu = self.momentum;
        let wd = self.weight_decay;
        let nesterov = self.nesterov;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.velocity.iter_mut())
            .for_each(|((p, g), v)| {
                let g = g + wd * *p;
                *v = (mu * *v) + g;
                let step = if nesterov { g + mu * *v } else { *v };
                *p -= lr * step;
            });

        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_builds_up() {
        let mut optimizer = GradientDescentWithMomentum::new(1, 1., 0.5);
        let mut params = [0.];

        optimizer.update_params(&[1.], &mut params).unwrap();
        assert_eq!(params, [-1.]);

        // v = 0.5 * 1 + 1
        optimizer.update_params(&[1.], &mut params).unwrap();
        assert_eq!(params, [-2.5]);
    }

    #[test]
    fn nesterov_looks_ahead() {
        let mut optimizer = GradientDescentWithMomentum::new(1, 1., 0.5).with_nesterov(true);
        let mut params = [0.];

        // v = 1, step = 1 + 0.5
        optimizer.update_params(&[1.], &mut params).unwrap();
        assert_eq!(params, [-1.5]);
    }

    #[test]
    fn weight_decay_pulls_towards_zero() {
        let mut optimizer = GradientDescentWithMomentum::new(1, 0.1, 0.).with_weight_decay(1.);
        let mut params = [2.];

        optimizer.update_params(&[0.], &mut params).unwrap();
        assert!((params[0] - 1.8).abs() < 1e-6);
    }
}
