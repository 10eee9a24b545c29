//! GPU-specific platform code.
//!
//! NVIDIA devices are read through NVML.

mod nvidia;

pub use nvidia::{NvidiaGpus, NvidiaSample};

/// Initialize NVML, or `None` when no NVIDIA driver is present
pub fn nvidia_gpus() -> Option<NvidiaGpus> {
    match NvidiaGpus::new() {
        Ok(gpus) => Some(gpus),
        Err(e) => {
            log::info!("NVIDIA sensors unavailable: {}", e);
            None
        }
    }
}
