use super::LossHistory;
use crate::Result;

/// The metrics of a finished epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    /// Zero based index of the epoch.
    pub epoch: usize,
    pub train_loss: f32,
    pub valid_loss: f32,
    /// Fraction of the training set classified correctly, in `[0, 1]`.
    pub train_acc: f32,
    /// Fraction of the validation set classified correctly, in `[0, 1]`.
    pub valid_acc: f32,
}

/// Receives the progress of a training run.
pub trait Reporter: Send {
    /// Called after every logged epoch.
    fn on_epoch_end(&mut self, report: &EpochReport) -> Result<()>;

    /// Called once, after the last epoch.
    fn on_training_end(&mut self, _history: &LossHistory) -> Result<()> {
        Ok(())
    }
}

impl Reporter for () {
    fn on_epoch_end(&mut self, _report: &EpochReport) -> Result<()> {
        Ok(())
    }
}

impl<A: Reporter, B: Reporter> Reporter for (A, B) {
    fn on_epoch_end(&mut self, report: &EpochReport) -> Result<()> {
        self.0.on_epoch_end(report)?;
        self.1.on_epoch_end(report)
    }

    fn on_training_end(&mut self, history: &LossHistory) -> Result<()> {
        self.0.on_training_end(history)?;
        self.1.on_training_end(history)
    }
}
