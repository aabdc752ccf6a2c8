use ndarray::{Array1, Array2, ArrayView2};

/// An un-reduced loss function.
///
/// Reduction (plain mean or importance-weighted mean) is left to the caller so
/// the same loss serves both full-data and weighted-subset training.
pub trait LossFn {
    /// Returns one loss value per row of `y_pred`.
    fn losses(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array1<f32>;

    /// Returns, row by row, the derivative of that row's loss with respect to
    /// that row's prediction.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32>;
}
