mod adam;
mod gradient_descent;
mod gradient_descent_with_momentum;
mod lr_schedule;
mod optim;

pub use adam::Adam;
pub use gradient_descent::GradientDescent;
pub use gradient_descent_with_momentum::GradientDescentWithMomentum;
pub use lr_schedule::LrSchedule;
pub use ml_core::{LrScheduler, Optimizer};
pub use optim::Optim;
