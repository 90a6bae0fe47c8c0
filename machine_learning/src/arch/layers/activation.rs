use ndarray::Array2;

use crate::{MlErr, Result, arch::Mode, arch::activations::ActFn};

/// Applies an activation function element-wise.
#[derive(Clone, Debug)]
pub struct Activation {
    act_fn: ActFn,

    // Forward metadata
    z: Option<Array2<f32>>,
}

impl Activation {
    pub fn new(act_fn: ActFn) -> Self {
        Self { act_fn, z: None }
    }

    pub fn forward(&mut self, x: Array2<f32>, mode: Mode) -> Array2<f32> {
        let act_fn = self.act_fn;
        let a = x.mapv(|z| act_fn.f(z));

        self.z = mode.is_train().then_some(x);
        a
    }

    pub fn backward(&mut self, mut d: Array2<f32>) -> Result<Array2<f32>> {
        let z = self.z.take().ok_or(MlErr::InferenceMode)?;

        if d.dim() != z.dim() {
            return Err(MlErr::SizeMismatch {
                what: "activation delta",
                got: d.len(),
                expected: z.len(),
            });
        }

        let act_fn = self.act_fn;
        d.zip_mut_with(&z, |d, &z| *d *= act_fn.df(z));
        Ok(d)
    }
}
