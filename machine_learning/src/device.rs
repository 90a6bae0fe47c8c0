use std::{fmt, num::NonZeroUsize};

use log::info;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::{MlErr, Result};

/// Where the numeric kernels of a training run execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    /// General purpose processor, `threads` workers (`None` lets rayon decide).
    Cpu { threads: Option<NonZeroUsize> },
    /// A CUDA accelerator.
    Cuda { ordinal: usize },
}

impl Default for Device {
    fn default() -> Self {
        Self::Cpu { threads: None }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu { threads: Some(n) } => write!(f, "cpu ({n} threads)"),
            Device::Cpu { threads: None } => write!(f, "cpu"),
            Device::Cuda { ordinal } => write!(f, "cuda:{ordinal}"),
        }
    }
}

/// The ndarray compute backend bound to a device.
///
/// Every parallel kernel launched inside `install` runs on the backend's own thread pool.
pub struct Backend {
    pool: ThreadPool,
}

impl Backend {
    /// Creates a new `Backend` for the given device.
    ///
    /// # Arguments
    /// * `device` - The device to run on.
    ///
    /// # Returns
    /// A new `Backend` or an error if this backend can't execute on `device`.
    pub fn new(device: Device) -> Result<Self> {
        let threads = match device {
            Device::Cpu { threads } => threads.map_or(0, NonZeroUsize::get),
            Device::Cuda { .. } => return Err(MlErr::DeviceUnavailable(device)),
        };

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("compute-{i}"))
            .build()
            .map_err(|e| MlErr::Backend(e.to_string()))?;

        info!("running on {device} with {} worker threads", pool.current_num_threads());
        Ok(Self { pool })
    }

    /// Returns whether this backend can run on `device`.
    pub fn supports(device: Device) -> bool {
        matches!(device, Device::Cpu { .. })
    }

    /// Runs `op` with this backend's thread pool as the current one.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}
