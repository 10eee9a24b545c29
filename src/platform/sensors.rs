//! Sensor provider backed by sysinfo (CPU) and NVML (NVIDIA GPUs).

use std::collections::HashMap;

use sysinfo::{Components, CpuRefreshKind, RefreshKind, System};

use super::gpu::{nvidia_gpus, NvidiaGpus, NvidiaSample};
use crate::core::telemetry::{
    DeviceHandle, DeviceKind, Sensor, SensorHandle, SensorKind, SensorProvider,
};
use crate::error::Result;

const CPU_DEVICE: DeviceHandle = DeviceHandle(0);

/// Where a sensor's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    CpuTotal,
    CpuCore(usize),
    CoreAverage,
    GpuTemperature,
    GpuLoad,
    GpuMemoryTotal,
    GpuMemoryFree,
    GpuMemoryUsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Cpu,
    Nvidia(u32),
}

struct Device {
    handle: DeviceHandle,
    kind: DeviceKind,
    name: String,
    backend: Backend,
}

/// Sensor provider for the local machine
pub struct SystemSensorProvider {
    system: System,
    components: Components,
    nvidia: Option<NvidiaGpus>,
    devices: Vec<Device>,
    sensors: Vec<(Sensor, Source)>,
    values: HashMap<SensorHandle, f32>,
}

impl SystemSensorProvider {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing().with_cpu(CpuRefreshKind::everything());

        Self {
            system: System::new_with_specifics(refresh_kind),
            components: Components::new(),
            nvidia: None,
            devices: Vec::new(),
            sensors: Vec::new(),
            values: HashMap::new(),
        }
    }

    fn enumerate(&mut self) {
        self.devices.clear();
        self.sensors.clear();
        self.values.clear();

        self.system.refresh_cpu_all();
        self.components = Components::new_with_refreshed_list();

        let cpu_name = self
            .system
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty())
            .unwrap_or_else(|| "Unknown CPU".to_string());
        self.devices.push(Device {
            handle: CPU_DEVICE,
            kind: DeviceKind::Cpu,
            name: cpu_name,
            backend: Backend::Cpu,
        });
        self.add_sensor(CPU_DEVICE, SensorKind::Load, "CPU Total", Source::CpuTotal);
        for index in 0..self.system.cpus().len() {
            let name = format!("CPU Core #{}", index + 1);
            self.add_sensor(CPU_DEVICE, SensorKind::Load, &name, Source::CpuCore(index));
        }
        if cpu_temperature(&self.components).is_some() {
            self.add_sensor(
                CPU_DEVICE,
                SensorKind::Temperature,
                "Core Average",
                Source::CoreAverage,
            );
        }

        let gpu_count = self.nvidia.as_ref().map_or(0, NvidiaGpus::device_count);
        for index in 0..gpu_count {
            let handle = DeviceHandle(index + 1);
            let name = self
                .nvidia
                .as_ref()
                .map(|gpus| gpus.name(index))
                .unwrap_or_default();
            self.devices.push(Device {
                handle,
                kind: DeviceKind::GpuNvidia,
                name,
                backend: Backend::Nvidia(index),
            });
            self.add_sensor(
                handle,
                SensorKind::Temperature,
                "GPU Core",
                Source::GpuTemperature,
            );
            self.add_sensor(handle, SensorKind::Load, "GPU Core", Source::GpuLoad);
            self.add_sensor(
                handle,
                SensorKind::SmallData,
                "GPU Memory Total",
                Source::GpuMemoryTotal,
            );
            self.add_sensor(
                handle,
                SensorKind::SmallData,
                "GPU Memory Free",
                Source::GpuMemoryFree,
            );
            self.add_sensor(
                handle,
                SensorKind::SmallData,
                "GPU Memory Used",
                Source::GpuMemoryUsed,
            );
        }

        log::debug!(
            "Enumerated {} devices with {} sensors",
            self.devices.len(),
            self.sensors.len()
        );
    }

    fn add_sensor(&mut self, device: DeviceHandle, kind: SensorKind, name: &str, source: Source) {
        let Some(owner) = self.devices.iter().find(|d| d.handle == device) else {
            return;
        };
        let sensor = Sensor {
            handle: SensorHandle(self.sensors.len() as u32),
            device,
            device_kind: owner.kind,
            device_name: owner.name.clone(),
            kind,
            name: name.to_string(),
        };
        self.sensors.push((sensor, source));
    }

    fn store(&mut self, handle: SensorHandle, value: Option<f32>) {
        match value {
            Some(value) => {
                self.values.insert(handle, value);
            }
            None => {
                self.values.remove(&handle);
            }
        }
    }

    fn update_cpu(&mut self) {
        self.system.refresh_cpu_usage();
        self.components.refresh(false);

        let total = self.system.global_cpu_usage();
        let cores: Vec<f32> = self.system.cpus().iter().map(|c| c.cpu_usage()).collect();
        let temperature = cpu_temperature(&self.components);

        let updates: Vec<_> = self
            .sensors
            .iter()
            .filter(|(sensor, _)| sensor.device == CPU_DEVICE)
            .map(|(sensor, source)| {
                let value = match source {
                    Source::CpuTotal => Some(total),
                    Source::CpuCore(index) => cores.get(*index).copied(),
                    Source::CoreAverage => temperature,
                    _ => None,
                };
                (sensor.handle, value)
            })
            .collect();

        for (handle, value) in updates {
            self.store(handle, value);
        }
    }

    fn update_nvidia(&mut self, device: DeviceHandle, index: u32) {
        let sample = match self.nvidia.as_ref().map(|gpus| gpus.sample(index)) {
            Some(Ok(sample)) => sample,
            Some(Err(e)) => {
                log::warn!("Failed to read NVIDIA GPU {}: {}", index, e);
                NvidiaSample::default()
            }
            None => NvidiaSample::default(),
        };

        let updates: Vec<_> = self
            .sensors
            .iter()
            .filter(|(sensor, _)| sensor.device == device)
            .map(|(sensor, source)| {
                let value = match source {
                    Source::GpuTemperature => sample.temperature_c,
                    Source::GpuLoad => sample.load_pct,
                    Source::GpuMemoryTotal => sample.memory_total_mb,
                    Source::GpuMemoryFree => sample.memory_free_mb,
                    Source::GpuMemoryUsed => sample.memory_used_mb,
                    _ => None,
                };
                (sensor.handle, value)
            })
            .collect();

        for (handle, value) in updates {
            self.store(handle, value);
        }
    }
}

impl Default for SystemSensorProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorProvider for SystemSensorProvider {
    fn open(&mut self) -> Result<()> {
        self.nvidia = nvidia_gpus();
        self.enumerate();
        Ok(())
    }

    fn update(&mut self, device: DeviceHandle) {
        let backend = self
            .devices
            .iter()
            .find(|d| d.handle == device)
            .map(|d| d.backend);

        match backend {
            Some(Backend::Cpu) => self.update_cpu(),
            Some(Backend::Nvidia(index)) => self.update_nvidia(device, index),
            None => log::debug!("Update requested for unknown device {:?}", device),
        }
    }

    fn list_sensors(&mut self, kinds: &[SensorKind]) -> Vec<Sensor> {
        self.sensors
            .iter()
            .filter(|(sensor, _)| kinds.contains(&sensor.kind))
            .map(|(sensor, _)| sensor.clone())
            .collect()
    }

    fn value(&self, sensor: SensorHandle) -> Option<f32> {
        self.values.get(&sensor).copied()
    }

    fn close(&mut self) {
        self.nvidia = None;
        self.devices.clear();
        self.sensors.clear();
        self.values.clear();
    }

    fn reset(&mut self) -> Result<()> {
        self.nvidia = nvidia_gpus();
        self.enumerate();
        Ok(())
    }
}

fn is_core_label(label: &str) -> bool {
    label.to_lowercase().contains("core")
}

fn is_cpu_label(label: &str) -> bool {
    let label = label.to_lowercase();
    ["cpu", "package", "tctl", "tdie", "k10temp"]
        .iter()
        .any(|needle| label.contains(needle))
}

/// Average temperature of the CPU core components
///
/// Falls back to package-level sensors when no per-core sensor exists and
/// returns `None` when the machine exposes neither.
fn cpu_temperature(components: &Components) -> Option<f32> {
    let readings: Vec<(String, f32)> = components
        .iter()
        .filter_map(|c| c.temperature().map(|t| (c.label().to_string(), t)))
        .filter(|(_, t)| t.is_finite())
        .collect();

    let average = |values: Vec<f32>| -> Option<f32> {
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f32>() / values.len() as f32)
        }
    };

    let cores: Vec<f32> = readings
        .iter()
        .filter(|(label, _)| is_core_label(label))
        .map(|(_, t)| *t)
        .collect();
    if !cores.is_empty() {
        return average(cores);
    }

    average(
        readings
            .iter()
            .filter(|(label, _)| is_cpu_label(label))
            .map(|(_, t)| *t)
            .collect(),
    )
}
