use ndarray::{parallel::prelude::*, prelude::*};

use super::ensure_size;
use crate::{MlErr, Result};

/// Averages non-overlapping `kernel` x `kernel` windows of every channel.
///
/// Trailing rows and columns that don't fill a whole window are dropped.
#[derive(Clone, Debug)]
pub struct AvgPool2d {
    channels: usize,
    kernel: usize,
    input_hw: (usize, usize),
    output_hw: (usize, usize),
}

impl AvgPool2d {
    /// Creates a new `AvgPool2d` layer.
    ///
    /// # Arguments
    /// * `channels` - The amount of channels to pool, each independently.
    /// * `kernel` - The side of the pooling window, also used as the stride.
    /// * `input_hw` - The (height, width) of each input channel.
    pub fn new(channels: usize, kernel: usize, input_hw: (usize, usize)) -> Result<Self> {
        let (h, w) = input_hw;

        if kernel == 0 || kernel > h || kernel > w {
            return Err(MlErr::InvalidInput("the pooling window must fit inside the input"));
        }

        Ok(Self {
            channels,
            kernel,
            input_hw,
            output_hw: (h / kernel, w / kernel),
        })
    }

    /// The (height, width) of each output channel.
    pub fn output_hw(&self) -> (usize, usize) {
        self.output_hw
    }

    pub fn in_features(&self) -> usize {
        self.channels * self.input_hw.0 * self.input_hw.1
    }

    pub fn out_features(&self) -> usize {
        self.channels * self.output_hw.0 * self.output_hw.1
    }

    pub fn forward(&self, x: Array2<f32>) -> Result<Array2<f32>> {
        ensure_size("avg pool input features", x.ncols(), self.in_features())?;

        let Self {
            channels,
            kernel: k,
            input_hw: (h, w),
            output_hw: (oh, ow),
        } = *self;
        let scale = 1. / (k * k) as f32;

        let mut out = Array2::zeros((x.nrows(), self.out_features()));
        out.axis_iter_mut(Axis(0))
            .into_par_iter()
            .zip(x.axis_iter(Axis(0)))
            .for_each(|(mut pooled, sample)| {
                for c in 0..channels {
                    for oy in 0..oh {
                        for ox in 0..ow {
                            let mut sum = 0.;
                            for ky in 0..k {
                                let row = c * h * w + (oy * k + ky) * w + ox * k;
                                for kx in 0..k {
                                    sum += sample[row + kx];
                                }
                            }

                            pooled[c * oh * ow + oy * ow + ox] = sum * scale;
                        }
                    }
                }
            });

        Ok(out)
    }

    pub fn backward(&self, d: Array2<f32>) -> Result<Array2<f32>> {
        ensure_size("avg pool output delta", d.ncols(), self.out_features())?;

        let Self {
            channels,
            kernel: k,
            input_hw: (h, w),
            output_hw: (oh, ow),
        } = *self;
        let scale = 1. / (k * k) as f32;

        let mut dx = Array2::zeros((d.nrows(), self.in_features()));
        dx.axis_iter_mut(Axis(0))
            .into_par_iter()
            .zip(d.axis_iter(Axis(0)))
            .for_each(|(mut sample, delta)| {
                for c in 0..channels {
                    for oy in 0..oh {
                        for ox in 0..ow {
                            let spread = delta[c * oh * ow + oy * ow + ox] * scale;
                            for ky in 0..k {
                                let row = c * h * w + (oy * k + ky) * w + ox * k;
                                for kx in 0..k {
                                    sample[row + kx] = spread;
                                }
                            }
                        }
                    }
                }
            });

        Ok(dx)
    }
}
