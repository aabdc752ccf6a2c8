use crate::MlError;

/// Snapshot and restore of a model's trainable state.
///
/// `State` is an opaque handle: callers hold it, clone it and hand it back,
/// but never look inside. Every call to `snapshot` must return a handle that
/// shares nothing with the model or with previously returned handles, so one
/// of them can be mutated without affecting the others.
pub trait Checkpoint {
    type State: Clone + PartialEq + Send + Sync;

    /// Captures the current trainable state.
    fn snapshot(&self) -> Self::State;

    /// Overwrites the trainable state with `state`.
    ///
    /// # Errors
    /// Returns `MlError::ShapeMismatch` if `state` was taken from a model with
    /// a different parameter layout.
    fn restore(&mut self, state: &Self::State) -> Result<(), MlError>;
}
