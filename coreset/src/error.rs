use std::{error::Error, fmt, io};

use machine_learning::{dataset::LoadErr, initialization::RandErr};
use ml_core::{DataError, MlError, SelectionError};

/// The coreset module's result type.
pub type Result<T> = std::result::Result<T, CoresetErr>;

/// Fatal failures of a coreset training run.
///
/// None of these are retried: they surface to the caller, which is expected to abort the run.
#[derive(Debug)]
pub enum CoresetErr {
    /// The run configuration is unusable, detected before training starts.
    InvalidConfig(String),

    /// A selection strategy failed or returned a malformed subset.
    Selection(SelectionError),

    /// The live model could not be brought back to its pre-selection state.
    StateIsolation(String),

    /// A subset epoch came up before any subset was built.
    MissingSubset { epoch: usize },

    /// Training produced a NaN, an infinity or an invalid weight.
    NumericalDivergence {
        epoch: usize,
        batch: usize,
        what: &'static str,
        value: f32,
    },

    Model(MlError),
    Data(DataError),
    Load(LoadErr),
    Io(io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for CoresetErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoresetErr::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            CoresetErr::Selection(e) => write!(f, "selection failed: {e}"),
            CoresetErr::StateIsolation(msg) => write!(f, "state isolation violated: {msg}"),
            CoresetErr::MissingSubset { epoch } => {
                write!(f, "epoch {epoch} trains on a subset but none was built")
            }
            CoresetErr::NumericalDivergence {
                epoch,
                batch,
                what,
                value,
            } => write!(
                f,
                "numerical divergence at epoch {epoch}, batch {batch}: {what} is {value}"
            ),
            CoresetErr::Model(e) => write!(f, "model error: {e}"),
            CoresetErr::Data(e) => write!(f, "data error: {e}"),
            CoresetErr::Load(e) => write!(f, "dataset loading failed: {e}"),
            CoresetErr::Io(e) => write!(f, "io error: {e}"),
            CoresetErr::Json(e) => write!(f, "malformed configuration: {e}"),
        }
    }
}

impl Error for CoresetErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CoresetErr::Selection(e) => Some(e),
            CoresetErr::Model(e) => Some(e),
            CoresetErr::Data(e) => Some(e),
            CoresetErr::Load(e) => Some(e),
            CoresetErr::Io(e) => Some(e),
            CoresetErr::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SelectionError> for CoresetErr {
    fn from(value: SelectionError) -> Self {
        Self::Selection(value)
    }
}

impl From<MlError> for CoresetErr {
    fn from(value: MlError) -> Self {
        Self::Model(value)
    }
}

impl From<DataError> for CoresetErr {
    fn from(value: DataError) -> Self {
        Self::Data(value)
    }
}

impl From<LoadErr> for CoresetErr {
    fn from(value: LoadErr) -> Self {
        Self::Load(value)
    }
}

impl From<io::Error> for CoresetErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CoresetErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<RandErr> for CoresetErr {
    fn from(value: RandErr) -> Self {
        Self::InvalidConfig(format!("parameter initialization: {value}"))
    }
}
