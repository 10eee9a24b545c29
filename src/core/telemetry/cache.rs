use std::collections::HashMap;

use super::sensors::{DeviceHandle, Sensor, SensorProvider, SensorReading};

/// Minimum time between two hardware updates of the same device
pub const DEBOUNCE_WINDOW_MS: u64 = 100;

/// Per-device debounce of hardware updates
///
/// Several sensors share one device, so a single update per device per window
/// serves every sensor read from it during a refresh cycle.
#[derive(Debug, Default)]
pub struct SensorCache {
    last_update: HashMap<DeviceHandle, u64>,
}

impl SensorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `device` is due for a fresh hardware update at `now_ms`
    pub fn should_query(&self, device: DeviceHandle, now_ms: u64) -> bool {
        match self.last_update.get(&device) {
            Some(&last) => now_ms.saturating_sub(last) > DEBOUNCE_WINDOW_MS,
            None => true,
        }
    }

    pub fn record_queried(&mut self, device: DeviceHandle, now_ms: u64) {
        self.last_update.insert(device, now_ms);
    }

    /// Read a sensor, updating its device first when the window has elapsed
    pub fn read(
        &mut self,
        provider: &mut dyn SensorProvider,
        sensor: &Sensor,
        now_ms: u64,
    ) -> SensorReading {
        if self.should_query(sensor.device, now_ms) {
            provider.update(sensor.device);
            self.record_queried(sensor.device, now_ms);
        }

        SensorReading {
            device_kind: sensor.device_kind,
            kind: sensor.kind,
            name: sensor.name.clone(),
            value: provider.value(sensor.handle),
        }
    }

    /// Forget every timestamp so the next read of each device refreshes it
    pub fn clear(&mut self) {
        self.last_update.clear();
    }

    pub fn len(&self) -> usize {
        self.last_update.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_update.is_empty()
    }
}
