#[cfg(feature = "nvml")]
use nvml_wrapper::{enum_wrappers::device::TemperatureSensor, Device, Nvml};

use crate::error::{LemonError, Result};

#[cfg(feature = "nvml")]
const BYTES_PER_MB: f32 = 1024.0 * 1024.0;

/// One read of an NVIDIA device. Fields NVML could not report are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NvidiaSample {
    pub temperature_c: Option<f32>,
    pub load_pct: Option<f32>,
    pub memory_total_mb: Option<f32>,
    pub memory_free_mb: Option<f32>,
    pub memory_used_mb: Option<f32>,
}

/// NVIDIA GPUs exposed through NVML
pub struct NvidiaGpus {
    #[cfg(feature = "nvml")]
    nvml: Nvml,
    device_count: u32,
}

impl NvidiaGpus {
    /// Initialize NVML and count the visible devices
    pub fn new() -> Result<Self> {
        #[cfg(feature = "nvml")]
        {
            let nvml = Nvml::init()
                .map_err(|e| LemonError::gpu_not_available(format!("Failed to init NVML: {}", e)))?;

            let device_count = nvml.device_count().map_err(|e| {
                LemonError::gpu_not_available(format!("Failed to count NVIDIA GPUs: {}", e))
            })?;

            Ok(Self { nvml, device_count })
        }
        #[cfg(not(feature = "nvml"))]
        {
            Err(LemonError::gpu_not_available(
                "NVIDIA GPU support not enabled",
            ))
        }
    }

    pub fn device_count(&self) -> u32 {
        self.device_count
    }

    #[cfg(feature = "nvml")]
    fn get_device(&self, index: u32) -> Result<Device<'_>> {
        self.nvml.device_by_index(index).map_err(|e| {
            LemonError::sensor_provider(format!("Failed to get GPU {}: {}", index, e))
        })
    }

    pub fn name(&self, index: u32) -> String {
        #[cfg(feature = "nvml")]
        {
            self.get_device(index)
                .and_then(|device| {
                    device
                        .name()
                        .map_err(|e| LemonError::sensor_provider(e.to_string()))
                })
                .unwrap_or_else(|_| "Unknown NVIDIA GPU".to_string())
        }
        #[cfg(not(feature = "nvml"))]
        {
            let _ = index;
            "Unknown NVIDIA GPU".to_string()
        }
    }

    pub fn sample(&self, index: u32) -> Result<NvidiaSample> {
        #[cfg(feature = "nvml")]
        {
            let device = self.get_device(index)?;

            let temperature_c = device
                .temperature(TemperatureSensor::Gpu)
                .ok()
                .map(|t| t as f32);

            let load_pct = device.utilization_rates().ok().map(|u| u.gpu as f32);

            let memory = device.memory_info().ok();

            Ok(NvidiaSample {
                temperature_c,
                load_pct,
                memory_total_mb: memory.as_ref().map(|m| m.total as f32 / BYTES_PER_MB),
                memory_free_mb: memory.as_ref().map(|m| m.free as f32 / BYTES_PER_MB),
                memory_used_mb: memory.as_ref().map(|m| m.used as f32 / BYTES_PER_MB),
            })
        }
        #[cfg(not(feature = "nvml"))]
        {
            let _ = index;
            Err(LemonError::gpu_not_available(
                "NVIDIA GPU support not enabled",
            ))
        }
    }
}
