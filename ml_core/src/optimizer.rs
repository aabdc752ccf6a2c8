use crate::MlError;

/// Defines the strategy for updating model parameters based on calculated gradients.
pub trait Optimizer {
    /// Updates the provided slice of parameters using the accumulated gradient.
    ///
    /// # Arguments
    /// * `grad` - A reference to the model's gradient.
    /// * `params` - The parameters to update.
    ///
    /// # Returns
    /// An error if there's a mismatch in the sizes of `grad` and `params`.
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<(), MlError>;

    /// Returns the current learning rate.
    fn learning_rate(&self) -> f32;

    /// Replaces the learning rate used by subsequent updates.
    fn set_learning_rate(&mut self, learning_rate: f32);
}

/// Per-epoch learning-rate policy.
pub trait LrScheduler {
    /// Advances the schedule by one epoch and returns the learning rate for
    /// the next one.
    fn step(&mut self) -> f32;
}
