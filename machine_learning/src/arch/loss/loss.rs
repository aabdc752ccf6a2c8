use ml_core::LossFn;
use ndarray::{Array1, Array2, ArrayView2};

use super::{CrossEntropy, Mse};

/// The loss functions a run can be configured with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Loss {
    Mse(Mse),
    CrossEntropy(CrossEntropy),
}

impl LossFn for Loss {
    fn losses(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array1<f32> {
        match self {
            Loss::Mse(l) => l.losses(y_pred, y),
            Loss::CrossEntropy(l) => l.losses(y_pred, y),
        }
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        match self {
            Loss::Mse(l) => l.loss_prime(y_pred, y),
            Loss::CrossEntropy(l) => l.loss_prime(y_pred, y),
        }
    }
}
