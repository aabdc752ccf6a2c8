mod error;
mod in_memory;
mod loader;
mod synthetic;

pub use error::LoadErr;
pub use in_memory::{InMemoryDataset, Splits};
pub use loader::{from_rows, read_csv};
pub use synthetic::blobs;
