pub use ml_core::MlError;

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlError>;

/// Checks that `got` and `expected` agree, naming `what` otherwise.
pub(crate) fn ensure_len(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(MlError::ShapeMismatch {
            what,
            got,
            expected,
        });
    }

    Ok(())
}
