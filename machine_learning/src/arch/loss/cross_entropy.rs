use ml_core::LossFn;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Softmax cross-entropy over raw logits.
///
/// Targets are expected one-hot (or any distribution), the softmax is folded into the loss so
/// the network's last layer should stay linear.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CrossEntropy;

impl CrossEntropy {
    pub fn new() -> Self {
        Self
    }
}

fn log_sum_exp(row: ArrayView1<f32>) -> f32 {
    let max = row.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
    max + row.mapv(|v| (v - max).exp()).sum().ln()
}

impl LossFn for CrossEntropy {
    fn losses(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array1<f32> {
        y_pred
            .axis_iter(Axis(0))
            .zip(y.axis_iter(Axis(0)))
            .map(|(z, t)| t.sum() * log_sum_exp(z) - t.dot(&z))
            .collect()
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let mut prime = y_pred.to_owned();

        for (mut row, t) in prime.axis_iter_mut(Axis(0)).zip(y.axis_iter(Axis(0))) {
            let lse = log_sum_exp(row.view());
            let mass = t.sum();
            row.zip_mut_with(&t, |p, &t| *p = (*p - lse).exp() * mass - t);
        }

        prime
    }
}
