use crate::{
    MlErr, Result,
    arch::{Mode, Model, loss::LossFn},
    dataset::DataLoader,
    optimization::Optimizer,
};

/// Runs one pass of gradient descent over every batch of `loader`.
///
/// # Returns
/// The mean loss over the samples of the epoch, each batch weighted by its length.
pub fn train_epoch<M, L>(
    loader: &mut DataLoader,
    model: &mut M,
    loss_fn: &L,
    optimizer: &mut dyn Optimizer,
) -> Result<f32>
where
    M: Model + ?Sized,
    L: LossFn + ?Sized,
{
    model.set_mode(Mode::Train);

    let mut running_loss = 0.;
    let mut total = 0;

    for (i, batch) in loader.batches().enumerate() {
        model.zero_grad();

        let (logits, _) = model.forward(batch.x())?;
        let loss = loss_fn.loss(logits.view(), batch.y())?;

        if !loss.is_finite() {
            return Err(MlErr::NonFiniteLoss { batch: i });
        }

        running_loss += loss * batch.len() as f32;
        total += batch.len();

        let d = loss_fn.loss_prime(logits.view(), batch.y())?;
        model.backward(d)?;
        model.step(optimizer)?;
    }

    mean(running_loss, total)
}

/// Measures the loss over every batch of `loader` without touching the parameters.
pub fn validate_epoch<M, L>(loader: &mut DataLoader, model: &mut M, loss_fn: &L) -> Result<f32>
where
    M: Model + ?Sized,
    L: LossFn + ?Sized,
{
    model.set_mode(Mode::Eval);

    let mut running_loss = 0.;
    let mut total = 0;

    for (i, batch) in loader.batches().enumerate() {
        let (logits, _) = model.forward(batch.x())?;
        let loss = loss_fn.loss(logits.view(), batch.y())?;

        if !loss.is_finite() {
            return Err(MlErr::NonFiniteLoss { batch: i });
        }

        running_loss += loss * batch.len() as f32;
        total += batch.len();
    }

    mean(running_loss, total)
}

fn mean(running_loss: f32, total: usize) -> Result<f32> {
    if total == 0 {
        return Err(MlErr::EmptyDataset);
    }

    Ok(running_loss / total as f32)
}
