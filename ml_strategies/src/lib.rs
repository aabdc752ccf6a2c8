//! Concrete subset-selection strategies.
//!
//! Every strategy implements `ml_core::SelectionStrategy`. Model-based ones own a private copy
//! of the model and only ever see the live parameters through the snapshot they are handed.

mod craig;
mod embedding;
pub mod facility;
mod glister;
mod gradmatch;
pub mod grouping;
pub mod omp;
mod random;

pub use craig::Craig;
pub use embedding::Embedder;
pub use glister::Glister;
pub use gradmatch::GradMatch;
pub use grouping::Grouping;
pub use random::RandomStrategy;
