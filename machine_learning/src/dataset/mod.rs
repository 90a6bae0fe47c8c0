mod batch;
mod loader;

pub use batch::Batch;
pub use loader::DataLoader;

use ndarray::{Array1, Array4, ArrayView4, Axis};

use crate::{MlErr, Result};

/// An in-memory set of labeled images.
#[derive(Debug, Clone)]
pub struct Dataset {
    images: Array4<f32>,
    labels: Vec<usize>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `images` - The pixels of every image one after the other, channels first.
    /// * `labels` - The class of each image.
    /// * `shape` - The (channels, height, width) of a single image.
    ///
    /// # Returns
    /// A new `Dataset` or an error if the buffers don't agree on the amount of samples.
    pub fn new(images: Vec<f32>, labels: Vec<usize>, shape: (usize, usize, usize)) -> Result<Self> {
        let (c, h, w) = shape;
        let sample_len = c * h * w;

        if sample_len == 0 {
            return Err(MlErr::InvalidInput("images must have at least one pixel"));
        }

        if images.len() != labels.len() * sample_len {
            return Err(MlErr::SizeMismatch {
                what: "image buffer",
                got: images.len(),
                expected: labels.len() * sample_len,
            });
        }

        let images = Array4::from_shape_vec((labels.len(), c, h, w), images)?;
        Ok(Self { images, labels })
    }

    /// Returns the amount of samples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The (channels, height, width) of each image.
    pub fn sample_shape(&self) -> (usize, usize, usize) {
        let (_, c, h, w) = self.images.dim();
        (c, h, w)
    }

    pub fn images(&self) -> ArrayView4<'_, f32> {
        self.images.view()
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Gathers the samples at `indices` into an owned batch.
    pub fn batch(&self, indices: &[usize]) -> Batch {
        let x = self.images.select(Axis(0), indices);
        let y = indices.iter().map(|&i| self.labels[i]).collect::<Array1<_>>();
        Batch::new(x, y)
    }
}
