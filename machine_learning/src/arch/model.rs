use ndarray::{Array2, ArrayView4};

use crate::{Result, optimization::Optimizer};

/// The execution mode of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Layers keep what they need for a backward pass.
    #[default]
    Train,
    /// Inference only, nothing is cached and backward passes are rejected.
    Eval,
}

impl Mode {
    pub fn is_train(self) -> bool {
        self == Mode::Train
    }
}

/// A classifier whose parameters are trained through gradients.
pub trait Model: Send {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// The model's parameters as one flat buffer.
    fn params(&self) -> &[f32];

    /// Switches the model between training and inference mode.
    fn set_mode(&mut self, mode: Mode);

    /// Makes a forward pass through the model.
    ///
    /// # Arguments
    /// * `x` - An input batch shaped (batch, channels, height, width).
    ///
    /// # Returns
    /// The logits and their row-wise softmax, both shaped (batch, classes).
    fn forward(&mut self, x: ArrayView4<f32>) -> Result<(Array2<f32>, Array2<f32>)>;

    /// Propagates the derivative of the loss with respect to the logits of the last forward
    /// pass back through the model, accumulating the parameters' gradient.
    fn backward(&mut self, d_logits: Array2<f32>) -> Result<()>;

    /// Clears the accumulated gradient.
    fn zero_grad(&mut self);

    /// Applies one optimization step using the accumulated gradient.
    fn step(&mut self, optimizer: &mut dyn Optimizer) -> Result<()>;
}
