use ndarray::{Array1, Array4, ArrayView1, ArrayView4};

/// A group of samples processed together, images shaped (batch, channels, height, width).
#[derive(Debug, Clone)]
pub struct Batch {
    x: Array4<f32>,
    y: Array1<usize>,
}

impl Batch {
    pub fn new(x: Array4<f32>, y: Array1<usize>) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> ArrayView4<'_, f32> {
        self.x.view()
    }

    pub fn y(&self) -> ArrayView1<'_, usize> {
        self.y.view()
    }

    /// Returns the amount of samples in the batch.
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}
