use ndarray::Array2;

use super::{Activation, AvgPool2d, Conv2d, Dense, Flatten};
use crate::{Result, arch::Mode, arch::activations::ActFn};

/// A layer of a `Sequential` model.
///
/// Every layer maps a (batch, features) matrix to another one, reading its parameters from the
/// slice it's handed on each pass.
#[derive(Clone, Debug)]
pub enum Layer {
    Conv2d(Conv2d),
    AvgPool2d(AvgPool2d),
    Activation(Activation),
    Flatten(Flatten),
    Dense(Dense),
}

impl Layer {
    pub fn conv2d(
        channels: (usize, usize),
        kernel: usize,
        input_hw: (usize, usize),
    ) -> Result<Self> {
        Ok(Self::Conv2d(Conv2d::new(channels, kernel, input_hw)?))
    }

    pub fn avg_pool2d(channels: usize, kernel: usize, input_hw: (usize, usize)) -> Result<Self> {
        Ok(Self::AvgPool2d(AvgPool2d::new(channels, kernel, input_hw)?))
    }

    pub fn tanh() -> Self {
        Self::Activation(Activation::new(ActFn::tanh()))
    }

    pub fn flatten() -> Self {
        Self::Flatten(Flatten)
    }

    pub fn dense(dim: (usize, usize)) -> Self {
        Self::Dense(Dense::new(dim))
    }

    /// Returns the amount of parameters this layer reads.
    pub fn size(&self) -> usize {
        match self {
            Self::Conv2d(l) => l.size(),
            Self::Dense(l) => l.size(),
            Self::AvgPool2d(_) | Self::Activation(_) | Self::Flatten(_) => 0,
        }
    }

    /// Returns the amount of inputs feeding each output unit, zero for parameterless layers.
    pub fn fan_in(&self) -> usize {
        match self {
            Self::Conv2d(l) => l.fan_in(),
            Self::Dense(l) => l.fan_in(),
            Self::AvgPool2d(_) | Self::Activation(_) | Self::Flatten(_) => 0,
        }
    }

    pub fn forward(&mut self, params: &[f32], x: Array2<f32>, mode: Mode) -> Result<Array2<f32>> {
        match self {
            Self::Conv2d(l) => l.forward(params, x, mode),
            Self::AvgPool2d(l) => l.forward(x),
            Self::Activation(l) => Ok(l.forward(x, mode)),
            Self::Flatten(l) => Ok(l.forward(x)),
            Self::Dense(l) => l.forward(params, x, mode),
        }
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        match self {
            Self::Conv2d(l) => l.backward(params, grad, d),
            Self::AvgPool2d(l) => l.backward(d),
            Self::Activation(l) => l.backward(d),
            Self::Flatten(l) => Ok(l.backward(d)),
            Self::Dense(l) => l.backward(params, grad, d),
        }
    }
}
