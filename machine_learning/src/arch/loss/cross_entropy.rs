use ndarray::{Array2, ArrayView1, ArrayView2, Axis, Zip};

use super::LossFn;
use crate::{MlErr, Result};

/// Computes the row-wise softmax of `logits`.
pub fn softmax(logits: ArrayView2<f32>) -> Array2<f32> {
    let mut probs = logits.to_owned();

    for mut row in probs.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |m, &z| m.max(z));
        row.mapv_inplace(|z| (z - max).exp());
        let sum = row.sum();
        row /= sum;
    }

    probs
}

/// Cross entropy between the softmax of the logits and the one-hot encoded labels, averaged
/// over the batch.
#[derive(Default, Clone, Copy, Debug)]
pub struct CrossEntropy;

impl CrossEntropy {
    /// Returns a new `CrossEntropy`.
    pub fn new() -> Self {
        Self
    }

    fn check(logits: ArrayView2<f32>, labels: ArrayView1<usize>) -> Result<()> {
        if logits.nrows() != labels.len() {
            return Err(MlErr::SizeMismatch {
                what: "labels",
                got: labels.len(),
                expected: logits.nrows(),
            });
        }

        if logits.nrows() == 0 {
            return Err(MlErr::EmptyDataset);
        }

        if labels.iter().any(|&y| y >= logits.ncols()) {
            return Err(MlErr::InvalidInput("label out of the range of classes"));
        }

        Ok(())
    }
}

impl LossFn for CrossEntropy {
    fn loss(&self, logits: ArrayView2<f32>, labels: ArrayView1<usize>) -> Result<f32> {
        Self::check(logits, labels)?;

        let total: f32 = logits
            .axis_iter(Axis(0))
            .zip(labels)
            .map(|(row, &y)| {
                let max = row.fold(f32::NEG_INFINITY, |m, &z| m.max(z));
                let log_sum_exp = row.mapv(|z| (z - max).exp()).sum().ln() + max;
                log_sum_exp - row[y]
            })
            .sum();

        Ok(total / logits.nrows() as f32)
    }

    fn loss_prime(
        &self,
        logits: ArrayView2<f32>,
        labels: ArrayView1<usize>,
    ) -> Result<Array2<f32>> {
        Self::check(logits, labels)?;

        let n = logits.nrows() as f32;
        let mut d = softmax(logits);

        Zip::from(d.rows_mut()).and(labels).for_each(|mut row, &y| {
            row[y] -= 1.;
            row /= n;
        });

        Ok(d)
    }
}
