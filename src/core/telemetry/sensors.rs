//! Sensor model and the hardware provider seam.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Kind of hardware device a sensor belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    Cpu,
    GpuNvidia,
    GpuAmd,
    GpuIntel,
    Other,
}

impl DeviceKind {
    pub fn is_gpu(self) -> bool {
        matches!(
            self,
            DeviceKind::GpuNvidia | DeviceKind::GpuAmd | DeviceKind::GpuIntel
        )
    }
}

/// Kind of measurement a sensor reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    Temperature,
    Load,
    /// Small data quantities such as VRAM, reported in MB
    SmallData,
}

/// The sensor kinds the aggregator consumes
pub const ENABLED_SENSOR_KINDS: &[SensorKind] = &[
    SensorKind::Temperature,
    SensorKind::Load,
    SensorKind::SmallData,
];

/// Opaque identity of a physical device, only meaningful to the provider that
/// issued it and only until the next `reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceHandle(pub u32);

/// Opaque identity of a sensor within its provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SensorHandle(pub u32);

/// An enumerated sensor. The value is read separately through the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    pub handle: SensorHandle,
    pub device: DeviceHandle,
    pub device_kind: DeviceKind,
    pub device_name: String,
    pub kind: SensorKind,
    pub name: String,
}

/// A sensor together with the value it reported on this read
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub device_kind: DeviceKind,
    pub kind: SensorKind,
    pub name: String,
    pub value: Option<f32>,
}

impl SensorReading {
    /// Value with absent readings treated as zero
    pub fn value_or_zero(&self) -> f32 {
        self.value.unwrap_or(0.0)
    }
}

/// Trait for hardware sensor providers
///
/// Implementations enumerate devices and their sensors. Refreshing a device is
/// expensive, so callers decide when to call `update` (see `SensorCache`) and
/// `value` returns whatever the device reported on its last update.
pub trait SensorProvider: Send {
    /// Open the underlying hardware interfaces
    fn open(&mut self) -> Result<()>;

    /// Re-read every sensor of one device
    fn update(&mut self, device: DeviceHandle);

    /// Enumerate sensors whose kind is listed in `kinds`, in stable order
    fn list_sensors(&mut self, kinds: &[SensorKind]) -> Vec<Sensor>;

    /// Last value reported by a sensor, if any
    fn value(&self, sensor: SensorHandle) -> Option<f32>;

    /// Release the underlying hardware interfaces
    fn close(&mut self);

    /// Drop enumerated devices so the next `list_sensors` sees current topology
    fn reset(&mut self) -> Result<()>;
}

/// Physical memory totals in KB, as reported by the OS
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryReading {
    pub total_kb: u64,
    pub available_kb: u64,
}

/// Trait for the OS memory query
pub trait MemoryProvider: Send {
    fn memory(&mut self) -> Option<MemoryReading>;
}
