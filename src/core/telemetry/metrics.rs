use serde::{Deserialize, Serialize};

/// Canonical hardware metrics resolved from the sensor set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub cpu_name: String,
    pub cpu_load_pct: f32,
    pub cpu_temp_c: f32,
    pub gpu_name: String,
    pub gpu_load_pct: f32,
    pub gpu_temp_c: f32,
    pub gpu_total_vram_mb: u64,
    pub gpu_avail_vram_mb: u64,
    pub total_memory_mb: u64,
    pub available_memory_mb: u64,
}

impl MetricSnapshot {
    pub fn used_memory_mb(&self) -> u64 {
        self.total_memory_mb.saturating_sub(self.available_memory_mb)
    }

    /// Share of physical memory in use, zero when the total is unknown
    pub fn memory_usage_percent(&self) -> f64 {
        if self.total_memory_mb == 0 {
            return 0.0;
        }
        self.used_memory_mb() as f64 / self.total_memory_mb as f64 * 100.0
    }

    /// Share of VRAM in use, zero when the total is unknown
    pub fn vram_usage_percent(&self) -> f64 {
        if self.gpu_total_vram_mb == 0 {
            return 0.0;
        }
        let used = self.gpu_total_vram_mb.saturating_sub(self.gpu_avail_vram_mb);
        used as f64 / self.gpu_total_vram_mb as f64 * 100.0
    }
}

/// The record served over HTTP: hardware metrics plus the current frame rate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub cpu_name: String,
    pub gpu_name: String,
    /// MB
    pub total_memory: u64,
    /// MB
    pub available_memory: u64,
    pub cpu_temp: f32,
    pub cpu_load: f32,
    pub gpu_temp: f32,
    pub gpu_load: f32,
    /// MB
    pub gpu_total_vram: u64,
    /// MB
    pub gpu_avail_vram: u64,
    pub curr_fps: f32,
}

impl Snapshot {
    pub fn new(metrics: &MetricSnapshot, fps: f32) -> Self {
        Self {
            cpu_name: metrics.cpu_name.clone(),
            gpu_name: metrics.gpu_name.clone(),
            total_memory: metrics.total_memory_mb,
            available_memory: metrics.available_memory_mb,
            cpu_temp: metrics.cpu_temp_c,
            cpu_load: metrics.cpu_load_pct,
            gpu_temp: metrics.gpu_temp_c,
            gpu_load: metrics.gpu_load_pct,
            gpu_total_vram: metrics.gpu_total_vram_mb,
            gpu_avail_vram: metrics.gpu_avail_vram_mb,
            curr_fps: fps,
        }
    }
}
