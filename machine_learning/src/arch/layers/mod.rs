mod activation;
mod avg_pool;
mod conv2d;
mod dense;
mod flatten;
mod layer;

pub use activation::Activation;
pub use avg_pool::AvgPool2d;
pub use conv2d::Conv2d;
pub use dense::Dense;
pub use flatten::Flatten;
pub use layer::Layer;

use crate::{MlErr, Result};

/// Fails with a `SizeMismatch` unless `got == expected`.
fn ensure_size(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(MlErr::SizeMismatch {
            what,
            got,
            expected,
        });
    }

    Ok(())
}
