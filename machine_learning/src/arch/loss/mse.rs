use ml_core::LossFn;
use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Mean squared error loss function, averaged over the columns of each row.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Mse;

impl Mse {
    /// Returns a new `Mse`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for Mse {
    fn losses(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array1<f32> {
        (&y_pred - &y)
            .mapv(|x| x.powi(2))
            .mean_axis(Axis(1))
            .unwrap_or_else(|| Array1::zeros(y_pred.nrows()))
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let cols = y_pred.ncols().max(1) as f32;
        (&y_pred - &y) * (2.0 / cols)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn one_loss_per_row() {
        let y_pred = array![[1., 3.], [0., 0.]];
        let y = array![[0., 1.], [0., 0.]];

        let losses = Mse.losses(y_pred.view(), y.view());
        assert_eq!(losses, array![2.5, 0.]);

        let prime = Mse.loss_prime(y_pred.view(), y.view());
        assert_eq!(prime, array![[1., 2.], [0., 0.]]);
    }
}
