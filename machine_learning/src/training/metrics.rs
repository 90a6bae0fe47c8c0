use ndarray::{ArrayView1, Axis};

use crate::{
    MlErr, Result,
    arch::{Mode, Model},
    dataset::DataLoader,
};

/// Returns the index of the largest value, the first one on ties.
fn argmax(row: ArrayView1<f32>) -> usize {
    let mut best = 0;

    for (i, &p) in row.iter().enumerate() {
        if p > row[best] {
            best = i;
        }
    }

    best
}

/// Computes the fraction of samples of `loader` that `model` classifies correctly.
///
/// The model is left in inference mode.
///
/// # Returns
/// The accuracy in `[0, 1]`, or `MlErr::EmptyDataset` if the loader has no samples.
pub fn accuracy<M>(model: &mut M, loader: &mut DataLoader) -> Result<f32>
where
    M: Model + ?Sized,
{
    model.set_mode(Mode::Eval);

    let mut correct = 0;
    let mut total = 0;

    for batch in loader.batches() {
        let (_, probs) = model.forward(batch.x())?;

        correct += probs
            .axis_iter(Axis(0))
            .zip(batch.y())
            .filter(|(row, y)| argmax(row.view()) == **y)
            .count();
        total += batch.len();
    }

    if total == 0 {
        return Err(MlErr::EmptyDataset);
    }

    Ok(correct as f32 / total as f32)
}
