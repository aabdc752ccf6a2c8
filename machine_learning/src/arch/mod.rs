pub mod activations;
pub mod layers;
pub mod loss;
mod layout;
mod sequential;

pub use layout::ParameterLayout;
pub use sequential::{ParamSnapshot, Sequential};
