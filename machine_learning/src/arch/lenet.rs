use std::{cell::RefCell, rc::Rc};

use ndarray::{Array2, ArrayView4};
use rand::{SeedableRng, rngs::StdRng};

use super::{Mode, Model, Sequential, layers::Layer, loss::softmax};
use crate::{
    MlErr, Result,
    initialization::{ChainedParamGen, ParamGen, RandParamGen},
    optimization::Optimizer,
};

/// The side of the square grayscale images LeNet-5 takes.
pub const INPUT_SIDE: usize = 32;

/// The classic LeNet-5 convolutional network.
///
/// ```text
/// 1x32x32 -> conv5 -> 6x28x28 -> tanh -> avgpool2 -> 6x14x14
///         -> conv5 -> 16x10x10 -> tanh -> avgpool2 -> 16x5x5
///         -> conv5 -> 120x1x1 -> tanh -> flatten
///         -> dense -> 84 -> tanh -> dense -> classes
/// ```
#[derive(Clone, Debug)]
pub struct LeNet5 {
    net: Sequential,
}

impl LeNet5 {
    /// Creates a new `LeNet5` with every layer initialized from `U(-1/sqrt(fan_in),
    /// 1/sqrt(fan_in))`.
    ///
    /// # Arguments
    /// * `n_classes` - The amount of classes to tell apart.
    /// * `rng` - The generator the initial parameters are drawn from.
    pub fn new(n_classes: usize, rng: &mut StdRng) -> Result<Self> {
        let layers = Self::layers(n_classes)?;
        let rng = Rc::new(RefCell::new(StdRng::from_rng(rng)));

        let mut param_gens: Vec<Box<dyn ParamGen>> = Vec::new();
        for layer in layers.iter().filter(|layer| layer.size() > 0) {
            let (size, fan_in) = (layer.size(), layer.fan_in());
            let param_gen = RandParamGen::fan_in_uniform(rng.clone(), size, fan_in)?;
            param_gens.push(Box::new(param_gen));
        }

        let mut param_gen = ChainedParamGen::new(param_gens);
        Self::from_layers(layers, &mut param_gen)
    }

    /// Creates a new `LeNet5` drawing its initial parameters from `param_gen`.
    pub fn with_param_gen(n_classes: usize, param_gen: &mut dyn ParamGen) -> Result<Self> {
        let layers = Self::layers(n_classes)?;
        Self::from_layers(layers, param_gen)
    }

    fn from_layers(layers: Vec<Layer>, param_gen: &mut dyn ParamGen) -> Result<Self> {
        let net = Sequential::new(layers, param_gen)?;
        Ok(Self { net })
    }

    fn layers(n_classes: usize) -> Result<Vec<Layer>> {
        if n_classes == 0 {
            return Err(MlErr::InvalidInput("the model needs at least one class"));
        }

        let side = INPUT_SIDE;
        Ok(vec![
            Layer::conv2d((1, 6), 5, (side, side))?,
            Layer::tanh(),
            Layer::avg_pool2d(6, 2, (28, 28))?,
            Layer::conv2d((6, 16), 5, (14, 14))?,
            Layer::tanh(),
            Layer::avg_pool2d(16, 2, (10, 10))?,
            Layer::conv2d((16, 120), 5, (5, 5))?,
            Layer::tanh(),
            Layer::flatten(),
            Layer::dense((120, 84)),
            Layer::tanh(),
            Layer::dense((84, n_classes)),
        ])
    }
}

impl Model for LeNet5 {
    fn size(&self) -> usize {
        self.net.size()
    }

    fn params(&self) -> &[f32] {
        self.net.params()
    }

    fn set_mode(&mut self, mode: Mode) {
        self.net.set_mode(mode);
    }

    fn forward(&mut self, x: ArrayView4<f32>) -> Result<(Array2<f32>, Array2<f32>)> {
        let (n, c, h, w) = x.dim();

        if (c, h, w) != (1, INPUT_SIDE, INPUT_SIDE) {
            return Err(MlErr::SizeMismatch {
                what: "image features",
                got: c * h * w,
                expected: INPUT_SIDE * INPUT_SIDE,
            });
        }

        let x = x
            .as_standard_layout()
            .into_owned()
            .into_shape_with_order((n, c * h * w))?;

        let logits = self.net.forward(x)?;
        let probs = softmax(logits.view());
        Ok((logits, probs))
    }

    fn backward(&mut self, d_logits: Array2<f32>) -> Result<()> {
        self.net.backward(d_logits)?;
        Ok(())
    }

    fn zero_grad(&mut self) {
        self.net.zero_grad();
    }

    fn step(&mut self, optimizer: &mut dyn Optimizer) -> Result<()> {
        self.net.step(optimizer)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{Array4, Axis};

    use super::*;
    use crate::initialization::ConstParamGen;

    #[test]
    fn has_the_classic_parameter_count() {
        let model = LeNet5::new(10, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(model.size(), 61_706);
    }

    #[test]
    fn initial_parameters_follow_each_layer_fan_in() {
        let model = LeNet5::new(10, &mut StdRng::seed_from_u64(42)).unwrap();
        let params = model.params();

        // first conv: 150 weights and 6 biases with fan-in 25
        assert!(params[..156].iter().all(|p| p.abs() <= 0.2));
        // last dense: fan-in 84
        let last = &params[params.len() - 850..];
        assert!(last.iter().all(|p| p.abs() <= 1. / 84f32.sqrt()));
        assert!(params.iter().any(|&p| p != 0.));
    }

    #[test]
    fn same_seed_same_model() {
        let a = LeNet5::new(10, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = LeNet5::new(10, &mut StdRng::seed_from_u64(1)).unwrap();
        let c = LeNet5::new(10, &mut StdRng::seed_from_u64(2)).unwrap();

        assert_eq!(a.params(), b.params());
        assert_ne!(a.params(), c.params());
    }

    #[test]
    fn forward_yields_logits_and_probabilities() {
        let mut model = LeNet5::new(10, &mut StdRng::seed_from_u64(42)).unwrap();
        model.set_mode(Mode::Eval);

        let x = Array4::from_elem((3, 1, 32, 32), 0.5);
        let (logits, probs) = model.forward(x.view()).unwrap();

        assert_eq!(logits.dim(), (3, 10));
        assert_eq!(probs.dim(), (3, 10));
        for row in probs.axis_iter(Axis(0)) {
            assert_abs_diff_eq!(row.sum(), 1., epsilon = 1e-5);
        }
    }

    #[test]
    fn wrong_image_size_is_rejected() {
        let mut model = LeNet5::with_param_gen(10, &mut ConstParamGen::unbounded(0.)).unwrap();
        let x = Array4::zeros((1, 1, 28, 28));

        assert!(model.forward(x.view()).is_err());
    }
}
