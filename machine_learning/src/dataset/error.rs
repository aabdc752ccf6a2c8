use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use crate::error::MlError;

/// Errors raised while loading a dataset from an external source.
#[derive(Debug)]
pub enum LoadErr {
    Io(io::Error),
    Parse { line: usize, msg: String },
    Shape(MlError),
}

impl Display for LoadErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadErr::Io(e) => write!(f, "io error: {e}"),
            LoadErr::Parse { line, msg } => write!(f, "line {line}: {msg}"),
            LoadErr::Shape(e) => write!(f, "invalid dataset: {e}"),
        }
    }
}

impl Error for LoadErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LoadErr::Io(e) => Some(e),
            LoadErr::Shape(e) => Some(e),
            LoadErr::Parse { .. } => None,
        }
    }
}

impl From<io::Error> for LoadErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<MlError> for LoadErr {
    fn from(value: MlError) -> Self {
        Self::Shape(value)
    }
}
