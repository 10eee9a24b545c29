use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;

use super::aggregator::MetricAggregator;
use super::cache::SensorCache;
use super::foreground::ForegroundWatcher;
use super::frame_rate::{FrameRateProvider, FrameRateTracker};
use super::metrics::{MetricSnapshot, Snapshot};
use super::sensors::{MemoryProvider, Sensor, SensorProvider, ENABLED_SENSOR_KINDS};
use crate::error::Result;

/// The collaborators a `Telemetry` instance drives
pub struct Providers {
    pub sensors: Box<dyn SensorProvider>,
    pub memory: Box<dyn MemoryProvider>,
    pub foreground: Box<dyn ForegroundWatcher>,
    pub frame_rate: Arc<dyn FrameRateProvider>,
}

/// Owned telemetry state for one request path
///
/// `refresh` is expected to be called sequentially; the only concurrent
/// activity is the frame-rate sampling task owned by the tracker.
pub struct Telemetry {
    provider: Box<dyn SensorProvider>,
    memory: Box<dyn MemoryProvider>,
    foreground: Box<dyn ForegroundWatcher>,
    frame_rate: Arc<dyn FrameRateProvider>,
    tracker: FrameRateTracker,
    cache: SensorCache,
    aggregator: MetricAggregator,
    sensors: Vec<Sensor>,
    epoch: Instant,
    closed: bool,
}

impl Telemetry {
    /// Open the sensor provider and enumerate the enabled sensors
    pub fn new(providers: Providers, runtime: Handle) -> Result<Self> {
        let Providers {
            sensors: mut provider,
            memory,
            foreground,
            frame_rate,
        } = providers;

        provider.open()?;
        let sensors = provider.list_sensors(ENABLED_SENSOR_KINDS);
        log::info!("Enumerated {} sensors", sensors.len());

        Ok(Self {
            provider,
            memory,
            foreground,
            tracker: FrameRateTracker::new(Arc::clone(&frame_rate), runtime),
            frame_rate,
            cache: SensorCache::new(),
            aggregator: MetricAggregator::new(),
            sensors,
            epoch: Instant::now(),
            closed: false,
        })
    }

    /// Recompute metrics, reconcile the frame-rate sampler, and snapshot both
    ///
    /// Never fails: anything a provider cannot report keeps its last value.
    pub fn refresh(&mut self) -> Snapshot {
        let now_ms = self.epoch.elapsed().as_millis() as u64;
        let memory = self.memory.memory();
        if memory.is_none() {
            log::warn!("Memory query returned no data");
        }

        self.aggregator.refresh(
            &self.sensors,
            self.provider.as_mut(),
            memory,
            &mut self.cache,
            now_ms,
        );

        match self.foreground.foreground_pid() {
            Ok(pid) => self.tracker.on_foreground_process_changed(pid),
            Err(e) => log::warn!("Failed to query foreground process: {}", e),
        }

        let metrics = self.aggregator.metrics();
        log::debug!(
            "Refreshed: cpu {:.1}% {:.1}C, gpu {:.1}% {:.1}C, memory {:.1}%",
            metrics.cpu_load_pct,
            metrics.cpu_temp_c,
            metrics.gpu_load_pct,
            metrics.gpu_temp_c,
            metrics.memory_usage_percent()
        );

        self.current_snapshot()
    }

    /// Drop cached timestamps, vendor preference and metrics, and re-enumerate
    pub fn reload(&mut self) -> Result<usize> {
        self.sensors.clear();
        self.cache.clear();
        self.aggregator.reset();
        self.provider.reset()?;

        self.sensors = self.provider.list_sensors(ENABLED_SENSOR_KINDS);
        log::info!("Reloaded hardware, {} sensors", self.sensors.len());
        Ok(self.sensors.len())
    }

    pub fn current_snapshot(&self) -> Snapshot {
        Snapshot::new(self.aggregator.metrics(), self.tracker.current_fps())
    }

    pub fn metrics(&self) -> &MetricSnapshot {
        self.aggregator.metrics()
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn tracker(&self) -> &FrameRateTracker {
        &self.tracker
    }

    /// Stop sampling, then release the frame-rate and sensor providers.
    /// Idempotent.
    pub async fn close(&mut self, grace: Duration) {
        if self.closed {
            return;
        }
        self.closed = true;

        self.tracker.shutdown(grace).await;
        match tokio::time::timeout(grace, self.frame_rate.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Failed to close frame rate provider: {}", e),
            Err(_) => log::warn!("Frame rate provider did not close within {:?}", grace),
        }
        self.provider.close();
        log::info!("Telemetry closed");
    }
}
