// In-memory collaborators for driving Telemetry and the frame-rate tracker

use futures_util::future::{BoxFuture, FutureExt};
use lemon_server::core::telemetry::{
    DeviceHandle, DeviceKind, ForegroundWatcher, FpsSink, FrameRateProvider, MemoryProvider,
    MemoryReading, Providers, Sensor, SensorHandle, SensorKind, SensorProvider,
};
use lemon_server::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Device handle, kind and name shared by the sensors of one fake device
pub type FakeDevice = (u32, DeviceKind, &'static str);

#[derive(Default)]
pub struct SensorState {
    pub sensors: Vec<Sensor>,
    pub values: HashMap<SensorHandle, Option<f32>>,
    pub updates: Vec<DeviceHandle>,
    pub opened: bool,
    pub closed: bool,
    pub resets: usize,
}

impl SensorState {
    pub fn add(
        &mut self,
        device: FakeDevice,
        kind: SensorKind,
        name: &str,
        value: Option<f32>,
    ) -> SensorHandle {
        let (device, device_kind, device_name) = device;
        let handle = SensorHandle(self.sensors.len() as u32);
        self.sensors.push(Sensor {
            handle,
            device: DeviceHandle(device),
            device_kind,
            device_name: device_name.to_string(),
            kind,
            name: name.to_string(),
        });
        self.values.insert(handle, value);
        handle
    }

    pub fn set(&mut self, handle: SensorHandle, value: f32) {
        self.values.insert(handle, Some(value));
    }
}

/// Sensor provider whose devices the test edits through the shared state
#[derive(Clone, Default)]
pub struct FakeSensors(pub Arc<Mutex<SensorState>>);

impl SensorProvider for FakeSensors {
    fn open(&mut self) -> Result<()> {
        self.0.lock().opened = true;
        Ok(())
    }

    fn update(&mut self, device: DeviceHandle) {
        self.0.lock().updates.push(device);
    }

    fn list_sensors(&mut self, kinds: &[SensorKind]) -> Vec<Sensor> {
        self.0
            .lock()
            .sensors
            .iter()
            .filter(|s| kinds.contains(&s.kind))
            .cloned()
            .collect()
    }

    fn value(&self, sensor: SensorHandle) -> Option<f32> {
        self.0.lock().values.get(&sensor).copied().flatten()
    }

    fn close(&mut self) {
        self.0.lock().closed = true;
    }

    fn reset(&mut self) -> Result<()> {
        self.0.lock().resets += 1;
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakeMemory(pub Arc<Mutex<Option<MemoryReading>>>);

impl MemoryProvider for FakeMemory {
    fn memory(&mut self) -> Option<MemoryReading> {
        *self.0.lock()
    }
}

#[derive(Clone, Default)]
pub struct FakeForeground(pub Arc<AtomicU32>);

impl FakeForeground {
    pub fn focus(&self, pid: u32) {
        self.0.store(pid, Ordering::SeqCst);
    }
}

impl ForegroundWatcher for FakeForeground {
    fn foreground_pid(&self) -> Result<u32> {
        Ok(self.0.load(Ordering::SeqCst))
    }
}

/// Frame-rate provider reporting each pid as its own frame rate
///
/// Pids listed in `stubborn` ignore cancellation and keep pushing for
/// `stubborn_for` before returning, like a sampler slow to tear down.
#[derive(Clone, Default)]
pub struct EchoFrameRate {
    pub started: Arc<Mutex<Vec<u32>>>,
    pub running: Arc<AtomicUsize>,
    pub stubborn: Vec<u32>,
    pub stubborn_for: Duration,
    /// Samplers still running at each `close`
    pub closes: Arc<Mutex<Vec<usize>>>,
}

impl EchoFrameRate {
    pub fn started(&self) -> Vec<u32> {
        self.started.lock().clone()
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> Vec<usize> {
        self.closes.lock().clone()
    }
}

struct RunningGuard(Arc<AtomicUsize>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FrameRateProvider for EchoFrameRate {
    fn sample(
        &self,
        pid: u32,
        sink: FpsSink,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<()>> {
        self.started.lock().push(pid);
        let running = Arc::clone(&self.running);
        let stubborn = self.stubborn.contains(&pid);
        let stubborn_for = self.stubborn_for;

        async move {
            running.fetch_add(1, Ordering::SeqCst);
            let _guard = RunningGuard(running);

            if stubborn {
                let deadline = tokio::time::Instant::now() + stubborn_for;
                while tokio::time::Instant::now() < deadline {
                    sink.push(pid as f32);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                }
                return Ok(());
            }

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(Duration::from_millis(2)) => {
                        if !sink.push(pid as f32) {
                            return Ok(());
                        }
                    }
                }
            }
        }
        .boxed()
    }

    fn close(&self) -> BoxFuture<'static, Result<()>> {
        let running = Arc::clone(&self.running);
        let closes = Arc::clone(&self.closes);

        async move {
            closes.lock().push(running.load(Ordering::SeqCst));
            Ok(())
        }
        .boxed()
    }
}

pub struct Fixture {
    pub sensors: FakeSensors,
    pub memory: FakeMemory,
    pub foreground: FakeForeground,
    pub frame_rate: EchoFrameRate,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            sensors: FakeSensors::default(),
            memory: FakeMemory::default(),
            foreground: FakeForeground::default(),
            frame_rate: EchoFrameRate::default(),
        }
    }

    pub fn providers(&self) -> Providers {
        Providers {
            sensors: Box::new(self.sensors.clone()),
            memory: Box::new(self.memory.clone()),
            foreground: Box::new(self.foreground.clone()),
            frame_rate: Arc::new(self.frame_rate.clone()),
        }
    }
}

pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(40)).await;
}
