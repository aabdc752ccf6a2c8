mod cross_entropy;
mod loss;
mod mse;

pub use cross_entropy::CrossEntropy;
pub use loss::Loss;
pub use mse::Mse;
