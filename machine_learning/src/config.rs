use std::{num::NonZeroUsize, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::device::Device;

const BATCH_SIZE: NonZeroUsize = NonZeroUsize::new(32).unwrap();

/// The optimization algorithm and its hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerConfig {
    Adam { lr: f32, b1: f32, b2: f32, eps: f32 },
    GradientDescent { lr: f32 },
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::Adam {
            lr: 0.001,
            b1: 0.9,
            b2: 0.999,
            eps: 1e-8,
        }
    }
}

/// Everything a training run is parameterized by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Seed of every random number generator, `None` seeds from the OS.
    pub seed: Option<u64>,
    pub optimizer: OptimizerConfig,
    pub batch_size: NonZeroUsize,
    pub epochs: usize,
    /// Side of the square images the model takes.
    pub image_size: usize,
    pub n_classes: usize,
    pub device: Device,
    /// Amount of epochs between reports.
    pub print_every: NonZeroUsize,
    /// Directory holding the `MNIST/raw` IDX files.
    pub data_root: PathBuf,
    /// Whether the loss plot is opened once training ends.
    pub show_plot: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: Some(42),
            optimizer: OptimizerConfig::default(),
            batch_size: BATCH_SIZE,
            epochs: 15,
            image_size: 32,
            n_classes: 10,
            device: Device::default(),
            print_every: NonZeroUsize::MIN,
            data_root: PathBuf::from("mnist_data"),
            show_plot: true,
        }
    }
}
