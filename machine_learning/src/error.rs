use std::{
    error::Error,
    fmt::{self, Display},
};

use ndarray::ShapeError;

use crate::device::Device;

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    /// A shape invariant was violated (e.g. mismatched lengths).
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// An array could not be viewed or reshaped with the requested shape.
    Shape(ShapeError),
    /// An input is invalid for semantic or domain reasons.
    InvalidInput(&'static str),
    /// A dataset or loader produced no samples at all.
    EmptyDataset,
    /// The loss diverged to NaN or infinity.
    NonFiniteLoss { batch: usize },
    /// A backward pass was requested while the model runs in inference mode.
    InferenceMode,
    /// The selected device is not provided by this backend.
    DeviceUnavailable(Device),
    /// The compute backend could not be set up.
    Backend(String),
    /// A parameter generator could not be built.
    Init(String),
    /// A reporter failed while handling a training event.
    Report(Box<dyn Error + Send + Sync>),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch for {what}, got {got} and expected {expected}"
            ),
            MlErr::Shape(e) => write!(f, "shape error: {e}"),
            MlErr::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            MlErr::EmptyDataset => write!(f, "the data loader yielded no samples"),
            MlErr::NonFiniteLoss { batch } => {
                write!(f, "the loss is not finite at batch {batch}")
            }
            MlErr::InferenceMode => {
                write!(f, "tried to run a backward pass while in inference mode")
            }
            MlErr::DeviceUnavailable(device) => {
                write!(f, "device {device} is not available on the ndarray backend")
            }
            MlErr::Backend(msg) => write!(f, "backend error: {msg}"),
            MlErr::Init(msg) => write!(f, "parameter initialization error: {msg}"),
            MlErr::Report(e) => write!(f, "reporter error: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Shape(e) => Some(e),
            MlErr::Report(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<ShapeError> for MlErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}
