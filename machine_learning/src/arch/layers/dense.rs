use ndarray::{linalg, prelude::*};

use super::ensure_size;
use crate::{MlErr, Result, arch::Mode};

/// A fully connected layer, `x·W + b`.
///
/// The parameter slice holds `W` row-major with shape (inputs, outputs) followed by `b`.
#[derive(Clone, Debug)]
pub struct Dense {
    dim: (usize, usize),
    size: usize,

    // Forward metadata
    x: Option<Array2<f32>>,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The amount of (inputs, outputs).
    pub fn new(dim: (usize, usize)) -> Self {
        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            x: None,
        }
    }

    /// Returns the size of this layer.
    ///
    /// # Returns
    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn fan_in(&self) -> usize {
        self.dim.0
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    pub fn forward(&mut self, params: &[f32], x: Array2<f32>, mode: Mode) -> Result<Array2<f32>> {
        ensure_size("dense input features", x.ncols(), self.dim.0)?;

        let (w, b) = self.view_params(params)?;
        let mut z = x.dot(&w);
        z += &b;

        self.x = mode.is_train().then_some(x);
        Ok(z)
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        let x = self.x.take().ok_or(MlErr::InferenceMode)?;
        ensure_size("dense output delta", d.ncols(), self.dim.1)?;

        let (mut dw, mut db) = self.view_grad(grad)?;
        linalg::general_mat_mul(1.0, &x.t(), &d, 1.0, &mut dw);
        db += &d.sum_axis(Axis(0));

        let (w, _) = self.view_params(params)?;
        Ok(d.dot(&w.t()))
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    ///
    /// # Arguments
    /// * `grad` - A gradient slice.
    ///
    /// # Returns
    /// A tuple containing the delta weights and delta biases.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        ensure_size("dense gradient", grad.len(), self.size)?;

        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw)?;
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw)?;
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    ///
    /// # Arguments
    /// * `params` - A slice of parameters.
    ///
    /// # Returns
    /// A tuple containing the weights and biases.
    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        ensure_size("dense parameters", params.len(), self.size)?;

        let w_size = self.size - self.dim.1;
        let weights = ArrayView2::from_shape(self.dim, &params[..w_size])?;
        let biases = ArrayView1::from_shape(self.dim.1, &params[w_size..])?;
        Ok((weights, biases))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn forward_computes_affine_map() {
        let mut dense = Dense::new((2, 3));
        #[rustfmt::skip]
        let params = [
            1., 0., -1.,
            2., 1.,  0.,
            0.5, 0., 1.,
        ];

        let y = dense
            .forward(&params, array![[1., 1.], [0., 2.]], Mode::Eval)
            .unwrap();

        let expected: Array2<f32> = array![[3.5, 1., 0.], [4.5, 2., 1.]];
        assert_eq!(y, expected);
    }

    #[test]
    fn backward_accumulates_into_grad() {
        let mut dense = Dense::new((2, 1));
        let params = [0.5, -0.5, 0.1];
        let mut grad = [0.; 3];
        let x = array![[1., 2.], [3., 4.]];

        dense.forward(&params, x.clone(), Mode::Train).unwrap();
        let dx = dense
            .backward(&params, &mut grad, array![[1.], [1.]])
            .unwrap();

        assert_eq!(grad, [4., 6., 2.]);
        let expected: Array2<f32> = array![[0.5, -0.5], [0.5, -0.5]];
        assert_eq!(dx, expected);

        dense.forward(&params, x, Mode::Train).unwrap();
        dense
            .backward(&params, &mut grad, array![[1.], [1.]])
            .unwrap();
        assert_abs_diff_eq!(grad[0], 8.);
    }

    #[test]
    fn backward_in_eval_mode_fails() {
        let mut dense = Dense::new((1, 1));
        let params = [1., 0.];
        let mut grad = [0.; 2];

        dense.forward(&params, array![[1.]], Mode::Eval).unwrap();
        let res = dense.backward(&params, &mut grad, array![[1.]]);
        assert!(matches!(res, Err(MlErr::InferenceMode)));
    }

    #[test]
    fn wrong_input_width_is_reported() {
        let mut dense = Dense::new((3, 1));
        let params = [0.; 4];

        let res = dense.forward(&params, Array2::zeros((2, 2)), Mode::Eval);
        assert!(matches!(
            res,
            Err(MlErr::SizeMismatch {
                got: 2,
                expected: 3,
                ..
            })
        ));
    }
}
