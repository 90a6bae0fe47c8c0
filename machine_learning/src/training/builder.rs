use log::debug;
use rand::{SeedableRng, rngs::StdRng};

use super::ModelTrainer;
use crate::{
    MlErr, Result,
    arch::{INPUT_SIDE, LeNet5, Model, loss::CrossEntropy},
    config::{OptimizerConfig, TrainingConfig},
    dataset::{DataLoader, Dataset},
    optimization::{Adam, GradientDescent, Optimizer},
};

/// The trainer built out of a `TrainingConfig`.
pub type LeNetTrainer = ModelTrainer<LeNet5, Box<dyn Optimizer>, CrossEntropy>;

/// Builds `ModelTrainer`s given a configuration.
#[derive(Default)]
pub struct TrainerBuilder;

impl TrainerBuilder {
    /// Creates a new `TrainerBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new trainer following a configuration.
    ///
    /// # Arguments
    /// * `config` - The configuration of the training run.
    /// * `train` - The samples the model learns from, reshuffled every epoch.
    /// * `valid` - The samples the model is validated on, always in the same order.
    pub fn build(
        &self,
        config: &TrainingConfig,
        train: Dataset,
        valid: Dataset,
    ) -> Result<LeNetTrainer> {
        if config.image_size != INPUT_SIDE {
            return Err(MlErr::InvalidInput("LeNet-5 only takes 32x32 images"));
        }

        let mut rng = self.generate_rng(config.seed);
        let model = LeNet5::new(config.n_classes, &mut rng)?;
        debug!("built LeNet-5 with {} parameters", model.size());

        let optimizer = self.resolve_optimizer(config.optimizer, model.size());
        let shuffle = StdRng::from_rng(&mut rng);

        let loaders = (
            DataLoader::new(train, config.batch_size, Some(shuffle)),
            DataLoader::new(valid, config.batch_size, None),
        );

        Ok(ModelTrainer::new(
            model,
            optimizer,
            CrossEntropy::new(),
            loaders,
            config.epochs,
            config.print_every,
        ))
    }

    fn resolve_optimizer(&self, config: OptimizerConfig, len: usize) -> Box<dyn Optimizer> {
        match config {
            OptimizerConfig::Adam { lr, b1, b2, eps } => Box::new(Adam::new(len, lr, b1, b2, eps)),
            OptimizerConfig::GradientDescent { lr } => Box::new(GradientDescent::new(lr)),
        }
    }

    fn generate_rng(&self, seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
