//! Resolution of raw sensors into canonical metrics.
//!
//! Each refresh walks the enabled sensor list in provider order. CPU sensors
//! always apply. GPU sensors apply only for the preferred vendor: NVIDIA over
//! AMD over Intel, where a vendor counts as present once any of its sensors has
//! been seen. That preference is sticky until `reset` so the reported GPU does
//! not flap between a discrete and an integrated device.

use super::cache::SensorCache;
use super::metrics::MetricSnapshot;
use super::sensors::{DeviceKind, MemoryReading, Sensor, SensorKind, SensorProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceClass {
    Cpu,
    Gpu,
}

impl DeviceClass {
    fn of(kind: DeviceKind) -> Option<Self> {
        match kind {
            DeviceKind::Cpu => Some(DeviceClass::Cpu),
            DeviceKind::GpuNvidia | DeviceKind::GpuAmd | DeviceKind::GpuIntel => {
                Some(DeviceClass::Gpu)
            }
            DeviceKind::Other => None,
        }
    }
}

/// Snapshot field a matched sensor writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricField {
    CpuTemp,
    CpuLoad,
    GpuTemp,
    GpuLoad,
    GpuTotalVram,
    GpuAvailVram,
}

impl MetricField {
    fn apply(self, metrics: &mut MetricSnapshot, value: f32) {
        match self {
            MetricField::CpuTemp => metrics.cpu_temp_c = value,
            MetricField::CpuLoad => metrics.cpu_load_pct = value,
            MetricField::GpuTemp => metrics.gpu_temp_c = value,
            MetricField::GpuLoad => metrics.gpu_load_pct = value,
            // Saturating cast: negative or NaN readings become 0
            MetricField::GpuTotalVram => metrics.gpu_total_vram_mb = value as u64,
            MetricField::GpuAvailVram => metrics.gpu_avail_vram_mb = value as u64,
        }
    }
}

struct MetricRule {
    class: DeviceClass,
    kind: SensorKind,
    name: &'static str,
    field: MetricField,
}

const METRIC_RULES: &[MetricRule] = &[
    MetricRule {
        class: DeviceClass::Cpu,
        kind: SensorKind::Temperature,
        name: "Core Average",
        field: MetricField::CpuTemp,
    },
    MetricRule {
        class: DeviceClass::Cpu,
        kind: SensorKind::Load,
        name: "CPU Total",
        field: MetricField::CpuLoad,
    },
    MetricRule {
        class: DeviceClass::Gpu,
        kind: SensorKind::Temperature,
        name: "GPU Core",
        field: MetricField::GpuTemp,
    },
    MetricRule {
        class: DeviceClass::Gpu,
        kind: SensorKind::Load,
        name: "GPU Core",
        field: MetricField::GpuLoad,
    },
    MetricRule {
        class: DeviceClass::Gpu,
        kind: SensorKind::Load,
        name: "D3D 3D",
        field: MetricField::GpuLoad,
    },
    MetricRule {
        class: DeviceClass::Gpu,
        kind: SensorKind::SmallData,
        name: "GPU Memory Total",
        field: MetricField::GpuTotalVram,
    },
    MetricRule {
        class: DeviceClass::Gpu,
        kind: SensorKind::SmallData,
        name: "GPU Memory Free",
        field: MetricField::GpuAvailVram,
    },
];

/// Look up the field a sensor feeds, if any
pub fn match_metric(device_kind: DeviceKind, kind: SensorKind, name: &str) -> Option<MetricField> {
    let class = DeviceClass::of(device_kind)?;
    METRIC_RULES
        .iter()
        .find(|rule| rule.class == class && rule.kind == kind && rule.name == name)
        .map(|rule| rule.field)
}

/// GPU vendors observed since the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpuVendorState {
    pub nvidia_seen: bool,
    pub amd_seen: bool,
}

impl GpuVendorState {
    /// Whether a sensor of this device kind may write GPU fields
    pub fn is_eligible(&self, kind: DeviceKind) -> bool {
        match kind {
            DeviceKind::GpuNvidia => true,
            DeviceKind::GpuAmd => !self.nvidia_seen,
            DeviceKind::GpuIntel => !self.nvidia_seen && !self.amd_seen,
            DeviceKind::Cpu | DeviceKind::Other => false,
        }
    }

    pub fn observe(&mut self, kind: DeviceKind) {
        match kind {
            DeviceKind::GpuNvidia => self.nvidia_seen = true,
            DeviceKind::GpuAmd => self.amd_seen = true,
            _ => {}
        }
    }
}

/// Long-lived aggregator holding the current metrics and vendor preference
#[derive(Debug, Default)]
pub struct MetricAggregator {
    metrics: MetricSnapshot,
    vendors: GpuVendorState,
}

impl MetricAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> &MetricSnapshot {
        &self.metrics
    }

    pub fn vendors(&self) -> GpuVendorState {
        self.vendors
    }

    /// Recompute metrics in place from one pass over `sensors`
    ///
    /// Fields without a matching sensor this pass keep their previous value.
    /// A `None` memory reading leaves the memory fields untouched as well.
    pub fn refresh(
        &mut self,
        sensors: &[Sensor],
        provider: &mut dyn SensorProvider,
        memory: Option<MemoryReading>,
        cache: &mut SensorCache,
        now_ms: u64,
    ) {
        if let Some(memory) = memory {
            self.apply_memory(memory);
        }

        for sensor in sensors {
            match sensor.device_kind {
                DeviceKind::Cpu => {
                    self.metrics.cpu_name.clone_from(&sensor.device_name);
                    self.apply_matching(sensor, provider, cache, now_ms);
                }
                kind if kind.is_gpu() => {
                    if self.vendors.is_eligible(kind) {
                        self.metrics.gpu_name.clone_from(&sensor.device_name);
                        self.apply_matching(sensor, provider, cache, now_ms);
                    }
                    self.vendors.observe(kind);
                }
                _ => {}
            }
        }
    }

    /// Drop metrics and vendor preference
    pub fn reset(&mut self) {
        self.metrics = MetricSnapshot::default();
        self.vendors = GpuVendorState::default();
    }

    fn apply_memory(&mut self, memory: MemoryReading) {
        self.metrics.total_memory_mb = memory.total_kb / 1024;
        self.metrics.available_memory_mb = memory.available_kb / 1024;
    }

    fn apply_matching(
        &mut self,
        sensor: &Sensor,
        provider: &mut dyn SensorProvider,
        cache: &mut SensorCache,
        now_ms: u64,
    ) {
        let Some(field) = match_metric(sensor.device_kind, sensor.kind, &sensor.name) else {
            return;
        };
        let reading = cache.read(provider, sensor, now_ms);
        field.apply(&mut self.metrics, reading.value_or_zero());
    }
}
