mod builder;
mod epoch;
mod history;
mod metrics;
mod model_trainer;
mod reporter;

pub use builder::{LeNetTrainer, TrainerBuilder};
pub use epoch::{train_epoch, validate_epoch};
pub use history::LossHistory;
pub use metrics::accuracy;
pub use model_trainer::ModelTrainer;
pub use reporter::{EpochReport, Reporter};
