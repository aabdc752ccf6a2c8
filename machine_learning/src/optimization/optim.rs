use ml_core::Optimizer;

use super::{Adam, GradientDescent, GradientDescentWithMomentum};
use crate::Result;

/// The optimizers a run can be configured with.
#[derive(Debug, Clone)]
pub enum Optim {
    GradientDescent(GradientDescent),
    GradientDescentWithMomentum(GradientDescentWithMomentum),
    Adam(Adam),
}

impl Optimizer for Optim {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        match self {
            Optim::GradientDescent(o) => o.update_params(grad, params),
            Optim::GradientDescentWithMomentum(o) => o.update_params(grad, params),
            Optim::Adam(o) => o.update_params(grad, params),
        }
    }

    fn learning_rate(&self) -> f32 {
        match self {
            Optim::GradientDescent(o) => o.learning_rate(),
            Optim::GradientDescentWithMomentum(o) => o.learning_rate(),
            Optim::Adam(o) => o.learning_rate(),
        }
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        match self {
            Optim::GradientDescent(o) => o.set_learning_rate(learning_rate),
            Optim::GradientDescentWithMomentum(o) => o.set_learning_rate(learning_rate),
            Optim::Adam(o) => o.set_learning_rate(learning_rate),
        }
    }
}
