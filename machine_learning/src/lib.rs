pub mod arch;
pub mod dataset;
pub mod error;
pub mod initialization;
pub mod optimization;

pub use error::Result;
