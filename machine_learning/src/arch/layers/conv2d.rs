use ndarray::{linalg, parallel::prelude::*, prelude::*};

use super::ensure_size;
use crate::{MlErr, Result, arch::Mode};

/// A 2D convolution with unit stride and no padding.
///
/// Activations travel as (batch, channels * height * width) matrices. The convolution is lowered
/// to a matrix product over the unfolded input patches (im2col), the unfolding being spread over
/// the samples of the batch on the current rayon pool.
///
/// The parameter slice holds the kernels with shape (out, in, kernel, kernel) followed by one
/// bias per output channel.
#[derive(Clone, Debug)]
pub struct Conv2d {
    in_channels: usize,
    out_channels: usize,
    kernel: usize,
    input_hw: (usize, usize),
    output_hw: (usize, usize),
    size: usize,

    // Forward metadata
    cols: Option<Array2<f32>>,
}

impl Conv2d {
    /// Creates a new `Conv2d` layer.
    ///
    /// # Arguments
    /// * `channels` - The amount of (input, output) channels.
    /// * `kernel` - The side of the square kernel.
    /// * `input_hw` - The (height, width) of each input channel.
    ///
    /// # Returns
    /// A new `Conv2d` or an error if the kernel doesn't fit in the input.
    pub fn new(channels: (usize, usize), kernel: usize, input_hw: (usize, usize)) -> Result<Self> {
        let (h, w) = input_hw;

        if kernel == 0 || kernel > h || kernel > w {
            return Err(MlErr::InvalidInput("the kernel must fit inside the input"));
        }

        let (in_channels, out_channels) = channels;
        let patch_len = in_channels * kernel * kernel;

        Ok(Self {
            in_channels,
            out_channels,
            kernel,
            input_hw,
            output_hw: (h - kernel + 1, w - kernel + 1),
            size: (patch_len + 1) * out_channels,
            cols: None,
        })
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn fan_in(&self) -> usize {
        self.patch_len()
    }

    /// The (height, width) of each output channel.
    pub fn output_hw(&self) -> (usize, usize) {
        self.output_hw
    }

    pub fn in_features(&self) -> usize {
        self.in_channels * self.input_hw.0 * self.input_hw.1
    }

    pub fn out_features(&self) -> usize {
        self.out_channels * self.spatial()
    }

    pub fn forward(&mut self, params: &[f32], x: Array2<f32>, mode: Mode) -> Result<Array2<f32>> {
        ensure_size("conv2d input features", x.ncols(), self.in_features())?;

        let n = x.nrows();
        let cols = self.im2col(x.view())?;
        let (w, b) = self.view_params(params)?;

        let mut out = cols.dot(&w.t());
        out += &b;

        self.cols = mode.is_train().then_some(cols);
        channels_first(out, n, self.spatial(), self.out_channels)
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        let cols = self.cols.take().ok_or(MlErr::InferenceMode)?;
        ensure_size("conv2d output delta", d.ncols(), self.out_features())?;

        let n = d.nrows();
        let d = channels_last(d, n, self.out_channels, self.spatial())?;

        let (mut dw, mut db) = self.view_grad(grad)?;
        linalg::general_mat_mul(1.0, &d.t(), &cols, 1.0, &mut dw);
        db += &d.sum_axis(Axis(0));

        let (w, _) = self.view_params(params)?;
        let d_cols = d.dot(&w);
        self.col2im(d_cols, n)
    }

    fn patch_len(&self) -> usize {
        self.in_channels * self.kernel * self.kernel
    }

    fn spatial(&self) -> usize {
        self.output_hw.0 * self.output_hw.1
    }

    /// Unfolds every kernel-sized patch of `x` into a row.
    ///
    /// # Returns
    /// A (batch * out_height * out_width, in_channels * kernel * kernel) matrix.
    fn im2col(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let Self {
            in_channels,
            kernel: k,
            input_hw: (h, w),
            output_hw: (oh, ow),
            ..
        } = *self;

        let n = x.nrows();
        let mut cols = Array3::zeros((n, self.spatial(), self.patch_len()));

        cols.axis_iter_mut(Axis(0))
            .into_par_iter()
            .zip(x.axis_iter(Axis(0)))
            .for_each(|(mut patches, sample)| {
                for oy in 0..oh {
                    for ox in 0..ow {
                        let mut patch = patches.row_mut(oy * ow + ox);
                        let mut c = 0;

                        for ic in 0..in_channels {
                            let channel = ic * h * w;
                            for ky in 0..k {
                                let row = channel + (oy + ky) * w + ox;
                                for kx in 0..k {
                                    patch[c] = sample[row + kx];
                                    c += 1;
                                }
                            }
                        }
                    }
                }
            });

        Ok(cols.into_shape_with_order((n * self.spatial(), self.patch_len()))?)
    }

    /// Folds the patch rows back into the input layout, adding up overlapping contributions.
    fn col2im(&self, d_cols: Array2<f32>, n: usize) -> Result<Array2<f32>> {
        let Self {
            in_channels,
            kernel: k,
            input_hw: (h, w),
            output_hw: (oh, ow),
            ..
        } = *self;

        let d_cols = d_cols.into_shape_with_order((n, self.spatial(), self.patch_len()))?;
        let mut dx = Array2::zeros((n, self.in_features()));

        dx.axis_iter_mut(Axis(0))
            .into_par_iter()
            .zip(d_cols.axis_iter(Axis(0)))
            .for_each(|(mut sample, patches)| {
                for oy in 0..oh {
                    for ox in 0..ow {
                        let patch = patches.row(oy * ow + ox);
                        let mut c = 0;

                        for ic in 0..in_channels {
                            let channel = ic * h * w;
                            for ky in 0..k {
                                let row = channel + (oy + ky) * w + ox;
                                for kx in 0..k {
                                    sample[row + kx] += patch[c];
                                    c += 1;
                                }
                            }
                        }
                    }
                }
            });

        Ok(dx)
    }

    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        ensure_size("conv2d gradient", grad.len(), self.size)?;

        let w_size = self.size - self.out_channels;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape((self.out_channels, self.patch_len()), dw_raw)?;
        let db = ArrayViewMut1::from_shape(self.out_channels, db_raw)?;
        Ok((dw, db))
    }

    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        ensure_size("conv2d parameters", params.len(), self.size)?;

        let w_size = self.size - self.out_channels;
        let kernels =
            ArrayView2::from_shape((self.out_channels, self.patch_len()), &params[..w_size])?;
        let biases = ArrayView1::from_shape(self.out_channels, &params[w_size..])?;
        Ok((kernels, biases))
    }
}

/// Turns a (batch * spatial, channels) matrix into (batch, channels * spatial).
fn channels_first(
    out: Array2<f32>,
    n: usize,
    spatial: usize,
    channels: usize,
) -> Result<Array2<f32>> {
    let out = out
        .into_shape_with_order((n, spatial, channels))?
        .permuted_axes([0, 2, 1])
        .as_standard_layout()
        .into_owned();

    Ok(out.into_shape_with_order((n, channels * spatial))?)
}

/// Turns a (batch, channels * spatial) matrix into (batch * spatial, channels).
fn channels_last(
    d: Array2<f32>,
    n: usize,
    channels: usize,
    spatial: usize,
) -> Result<Array2<f32>> {
    let d = d
        .as_standard_layout()
        .into_owned()
        .into_shape_with_order((n, channels, spatial))?
        .permuted_axes([0, 2, 1])
        .as_standard_layout()
        .into_owned();

    Ok(d.into_shape_with_order((n * spatial, channels))?)
}
