use ndarray::{Array2, ArrayView2};

use crate::MlError;

/// A trainable computational model over a flat parameter buffer.
///
/// A `Model` defines how to evaluate a function and accumulate parameter
/// gradients. It does not:
/// - access datasets,
/// - choose which examples it is trained on,
/// - implement training loops.
pub trait Model {
    /// Returns the number of scalar parameters.
    fn num_params(&self) -> usize;

    /// Computes the model output for a batch, one row per example.
    ///
    /// The model keeps whatever it needs from this pass to run `backward`.
    ///
    /// # Errors
    /// Returns `MlError` if invariants are violated (e.g., shape mismatch).
    fn forward(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>, MlError>;

    /// Backpropagates `d`, the derivative of the objective with respect to the
    /// output of the last `forward`, and accumulates it into the gradient.
    ///
    /// Implementations must add to the gradient rather than overwrite it.
    ///
    /// # Errors
    /// Returns `MlError` if there was no prior forward pass or shapes differ.
    fn backward(&mut self, d: ArrayView2<f32>) -> Result<(), MlError>;

    /// Resets the accumulated gradient to zero.
    fn zero_grad(&mut self);

    /// Returns the parameters.
    fn params(&self) -> &[f32];

    /// Returns the parameters for writing along with the current gradient.
    fn params_and_grad(&mut self) -> (&mut [f32], &[f32]);
}
