use super::Tanh;

#[derive(Clone, Copy, Debug)]
pub enum ActFn {
    Tanh(Tanh),
}

impl ActFn {
    pub fn tanh() -> Self {
        Self::Tanh(Tanh::new())
    }

    pub fn f(&self, x: f32) -> f32 {
        match self {
            Self::Tanh(a) => a.f(x),
        }
    }

    pub fn df(&self, x: f32) -> f32 {
        match self {
            Self::Tanh(a) => a.df(x),
        }
    }
}
