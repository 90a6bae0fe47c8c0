use serde::Serialize;

/// The mean loss of every epoch of a training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LossHistory {
    pub train: Vec<f32>,
    pub valid: Vec<f32>,
}

impl LossHistory {
    pub fn with_capacity(epochs: usize) -> Self {
        Self {
            train: Vec::with_capacity(epochs),
            valid: Vec::with_capacity(epochs),
        }
    }

    pub fn push(&mut self, train_loss: f32, valid_loss: f32) {
        self.train.push(train_loss);
        self.valid.push(valid_loss);
    }

    /// Returns the amount of recorded epochs.
    pub fn len(&self) -> usize {
        self.train.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train.is_empty()
    }
}
