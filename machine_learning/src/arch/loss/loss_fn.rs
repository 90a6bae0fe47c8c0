use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::Result;

/// A loss over the logits of a classifier and the true class of each sample.
pub trait LossFn: Send {
    /// The mean loss over the batch.
    fn loss(&self, logits: ArrayView2<f32>, labels: ArrayView1<usize>) -> Result<f32>;

    /// The derivative of `loss` with respect to `logits`.
    fn loss_prime(&self, logits: ArrayView2<f32>, labels: ArrayView1<usize>)
    -> Result<Array2<f32>>;
}
