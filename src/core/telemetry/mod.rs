//! Telemetry core.
//!
//! Sensor debouncing and aggregation into canonical metrics, and frame-rate
//! sampling that follows the foreground process.

mod aggregator;
mod cache;
mod foreground;
mod frame_rate;
mod metrics;
mod sensors;
mod service;

pub use aggregator::{match_metric, GpuVendorState, MetricAggregator, MetricField};
pub use cache::{SensorCache, DEBOUNCE_WINDOW_MS};
pub use foreground::{ForegroundWatcher, NO_FOREGROUND_PROCESS};
pub use frame_rate::{FpsSink, FrameRateProvider, FrameRateTracker};
pub use metrics::{MetricSnapshot, Snapshot};
pub use sensors::{
    DeviceHandle, DeviceKind, MemoryProvider, MemoryReading, Sensor, SensorHandle, SensorKind,
    SensorProvider, SensorReading, ENABLED_SENSOR_KINDS,
};
pub use service::{Providers, Telemetry};
