use super::ParamGen;

/// A parameter generator that delegates to a chain of generators, one after the other.
///
/// The model builds one generator per layer, each sized to that layer, so every layer can be
/// initialized according to its own fan-in.
pub struct ChainedParamGen<'a> {
    param_gens: Vec<Box<dyn ParamGen + 'a>>,
    curr: usize,
}

impl<'a> ChainedParamGen<'a> {
    /// Creates a new `ChainedParamGen`.
    ///
    /// # Arguments
    /// * `param_gens` - The generators to drain in order.
    pub fn new(param_gens: Vec<Box<dyn ParamGen + 'a>>) -> Self {
        Self {
            param_gens,
            curr: 0,
        }
    }
}

impl ParamGen for ChainedParamGen<'_> {
    fn sample(&mut self, n: usize) -> Option<Vec<f32>> {
        let mut sample = Vec::with_capacity(n);

        while let Some(param_gen) = self.param_gens.get_mut(self.curr) {
            let missing = n - sample.len();
            if missing == 0 {
                break;
            }

            let drawn = param_gen.sample(missing).unwrap_or_default();

            // A generator that falls short is spent, the rest comes from the next one.
            if drawn.len() < missing {
                self.curr += 1;
            }
            sample.extend(drawn);
        }

        if sample.is_empty() && (n > 0 || self.curr == self.param_gens.len()) {
            return None;
        }

        Some(sample)
    }
}
