use std::num::NonZeroUsize;

use log::{debug, info};

use super::{EpochReport, LossHistory, Reporter, accuracy, train_epoch, validate_epoch};
use crate::{
    Result,
    arch::{Model, loss::LossFn},
    dataset::DataLoader,
    optimization::Optimizer,
};

/// A model trainer. Contains the relevant components needed for training a model,
/// including the model itself.
pub struct ModelTrainer<M, O, L>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
{
    model: M,
    optimizer: O,
    loss_fn: L,
    train_loader: DataLoader,
    valid_loader: DataLoader,

    epochs: usize,
    print_every: NonZeroUsize,
}

impl<M, O, L> ModelTrainer<M, O, L>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
{
    /// Returns a new `ModelTrainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `optimizer` - The optimizer updating the model's parameters.
    /// * `loss_fn` - The loss function used to measure the difference between a model's output
    ///   and the expected one.
    /// * `loaders` - The (training, validation) data loaders.
    /// * `epochs` - The amount of passes over the training set.
    /// * `print_every` - The amount of epochs between reports.
    pub fn new(
        model: M,
        optimizer: O,
        loss_fn: L,
        loaders: (DataLoader, DataLoader),
        epochs: usize,
        print_every: NonZeroUsize,
    ) -> Self {
        let (train_loader, valid_loader) = loaders;

        Self {
            model,
            optimizer,
            loss_fn,
            train_loader,
            valid_loader,
            epochs,
            print_every,
        }
    }

    /// Trains the model for every configured epoch, validating it after each one.
    ///
    /// Every `print_every` epochs the accuracy over both the training and the validation sets
    /// is measured and handed to `reporter`.
    ///
    /// # Returns
    /// The training and validation loss of every epoch.
    pub fn train<R>(&mut self, reporter: &mut R) -> Result<LossHistory>
    where
        R: Reporter + ?Sized,
    {
        info!(
            "training {} parameters for {} epochs on {} samples, validating on {}",
            self.model.size(),
            self.epochs,
            self.train_loader.len(),
            self.valid_loader.len()
        );

        let print_every = self.print_every.get();
        let mut history = LossHistory::with_capacity(self.epochs);

        for epoch in 0..self.epochs {
            let train_loss = train_epoch(
                &mut self.train_loader,
                &mut self.model,
                &self.loss_fn,
                &mut self.optimizer,
            )?;
            let valid_loss =
                validate_epoch(&mut self.valid_loader, &mut self.model, &self.loss_fn)?;

            history.push(train_loss, valid_loss);
            debug!("epoch {epoch}: train loss {train_loss}, valid loss {valid_loss}");

            if epoch % print_every == print_every - 1 {
                let report = EpochReport {
                    epoch,
                    train_loss,
                    valid_loss,
                    train_acc: accuracy(&mut self.model, &mut self.train_loader)?,
                    valid_acc: accuracy(&mut self.model, &mut self.valid_loader)?,
                };

                reporter.on_epoch_end(&report)?;
            }
        }

        reporter.on_training_end(&history)?;
        Ok(history)
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    /// Consumes the trainer, returning the trained model and the optimizer's final state.
    pub fn into_parts(self) -> (M, O) {
        (self.model, self.optimizer)
    }
}
