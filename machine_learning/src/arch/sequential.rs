use ndarray::Array2;

use super::{Mode, layers::Layer};
use crate::{MlErr, Result, initialization::ParamGen, optimization::Optimizer};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// The parameters of every layer live in one flat buffer, each layer reading the slice that
/// follows the previous layer's. The gradient buffer mirrors that layout.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Layer>,
    params: Vec<f32>,
    grad: Vec<f32>,
    mode: Mode,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    /// * `param_gen` - The generator of the initial parameters.
    ///
    /// # Returns
    /// A new `Sequential` or an error if the generator can't fill every parameter.
    pub fn new<I>(layers: I, param_gen: &mut dyn ParamGen) -> Result<Self>
    where
        I: IntoIterator<Item = Layer>,
    {
        let layers: Vec<Layer> = layers.into_iter().collect();
        let size = layers.iter().map(Layer::size).sum();

        let params = param_gen.sample(size).unwrap_or_default();
        if params.len() != size {
            return Err(MlErr::SizeMismatch {
                what: "initial parameters",
                got: params.len(),
                expected: size,
            });
        }

        Ok(Self {
            layers,
            grad: vec![0.; size],
            params,
            mode: Mode::default(),
        })
    }

    pub fn size(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    pub fn grad(&self) -> &[f32] {
        &self.grad
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `x` - The input data, one sample per row.
    ///
    /// # Returns
    /// The output of the last layer or an error if occurred.
    pub fn forward(&mut self, mut x: Array2<f32>) -> Result<Array2<f32>> {
        let mut offset = 0;

        for layer in self.layers.iter_mut() {
            let size = layer.size();
            let params = &self.params[offset..offset + size];
            offset += size;

            x = layer.forward(params, x, self.mode)?;
        }

        Ok(x)
    }

    /// Propagates `d`, the derivative of the loss with respect to the output of the last
    /// forward pass, accumulating the gradient of every layer.
    ///
    /// # Returns
    /// The derivative of the loss with respect to the input.
    pub fn backward(&mut self, mut d: Array2<f32>) -> Result<Array2<f32>> {
        if !self.mode.is_train() {
            return Err(MlErr::InferenceMode);
        }

        let mut end = self.params.len();

        for layer in self.layers.iter_mut().rev() {
            let start = end - layer.size();
            let params = &self.params[start..end];
            let grad = &mut self.grad[start..end];
            end = start;

            d = layer.backward(params, grad, d)?;
        }

        Ok(d)
    }

    pub fn zero_grad(&mut self) {
        self.grad.fill(0.);
    }

    /// Updates the parameters with the accumulated gradient.
    pub fn step(&mut self, optimizer: &mut dyn Optimizer) -> Result<()> {
        optimizer.update_params(&mut self.params, &self.grad)
    }
}
