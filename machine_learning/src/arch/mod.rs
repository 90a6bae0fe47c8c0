pub mod activations;
pub mod layers;
pub mod loss;
mod lenet;
mod model;
mod sequential;

pub use lenet::{INPUT_SIDE, LeNet5};
pub use model::{Mode, Model};
pub use sequential::Sequential;
