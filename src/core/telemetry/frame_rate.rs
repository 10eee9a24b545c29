//! Frame-rate sampling bound to the foreground process.
//!
//! The tracker owns at most one current sampling task. Every task is tagged
//! with a generation; the shared FPS slot only accepts writes from the task
//! whose generation matches, so a superseded task that is still winding down
//! can neither publish samples nor zero the value of its successor.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::foreground::NO_FOREGROUND_PROCESS;
use crate::error::Result;

/// Trait for frame-rate sources
///
/// `sample` returns a future that measures `pid` and pushes each value into
/// `sink` until `cancel` fires, the process goes away, or the sink reports it
/// has been superseded. Smoothing and sampling period are up to the provider.
///
/// `close` releases whatever the provider keeps beyond a single sampling task
/// and is called once, after the last task has stopped.
pub trait FrameRateProvider: Send + Sync {
    fn sample(
        &self,
        pid: u32,
        sink: FpsSink,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<()>>;

    fn close(&self) -> BoxFuture<'static, Result<()>> {
        async { Ok(()) }.boxed()
    }
}

#[derive(Debug, Default)]
struct FpsSlot {
    generation: u64,
    fps: f32,
}

/// Write handle for one sampling task
#[derive(Debug, Clone)]
pub struct FpsSink {
    slot: Arc<Mutex<FpsSlot>>,
    generation: u64,
}

impl FpsSink {
    /// Publish a sample. Returns false once this task has been superseded.
    pub fn push(&self, fps: f32) -> bool {
        let mut slot = self.slot.lock();
        if slot.generation != self.generation {
            return false;
        }
        slot.fps = fps;
        true
    }

    pub fn is_current(&self) -> bool {
        self.slot.lock().generation == self.generation
    }

    fn reset(&self) {
        self.push(0.0);
    }
}

struct ActiveSampler {
    pid: u32,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct TrackerState {
    active: Option<ActiveSampler>,
}

/// Restarts frame-rate sampling whenever the foreground process changes
pub struct FrameRateTracker {
    provider: Arc<dyn FrameRateProvider>,
    runtime: Handle,
    state: Mutex<TrackerState>,
    slot: Arc<Mutex<FpsSlot>>,
}

impl FrameRateTracker {
    pub fn new(provider: Arc<dyn FrameRateProvider>, runtime: Handle) -> Self {
        Self {
            provider,
            runtime,
            state: Mutex::new(TrackerState::default()),
            slot: Arc::new(Mutex::new(FpsSlot::default())),
        }
    }

    /// Reconcile the sampler with the current foreground pid
    ///
    /// A pid equal to the one being sampled is a no-op. Any other pid cancels
    /// the current task; `NO_FOREGROUND_PROCESS` leaves the tracker idle.
    pub fn on_foreground_process_changed(&self, pid: u32) {
        let mut state = self.state.lock();

        if state.active.as_ref().map(|a| a.pid) == Some(pid) {
            return;
        }

        let generation = self.supersede();
        if let Some(previous) = state.active.take() {
            log::debug!("Cancelling frame rate sampling for pid {}", previous.pid);
            previous.cancel.cancel();
        }

        if pid == NO_FOREGROUND_PROCESS {
            return;
        }

        let sink = FpsSink {
            slot: Arc::clone(&self.slot),
            generation,
        };
        let cancel = CancellationToken::new();
        let sampling = self.provider.sample(pid, sink.clone(), cancel.clone());
        let task_cancel = cancel.clone();

        log::info!("Sampling frame rate for pid {}", pid);
        let task = self.runtime.spawn(async move {
            match sampling.await {
                Ok(()) if task_cancel.is_cancelled() => {
                    log::debug!("Frame rate sampling for pid {} cancelled", pid);
                }
                Ok(()) => {
                    log::info!("Frame rate sampling for pid {} ended", pid);
                }
                Err(e) if task_cancel.is_cancelled() => {
                    log::debug!("Frame rate sampling for pid {} cancelled: {}", pid, e);
                }
                Err(e) => {
                    log::error!("Frame rate sampling for pid {} failed: {}", pid, e);
                }
            }
            sink.reset();
        });

        state.active = Some(ActiveSampler { pid, cancel, task });
    }

    /// Latest value published by the current sampling task
    pub fn current_fps(&self) -> f32 {
        self.slot.lock().fps
    }

    /// Pid bound to the current sampling task, if any
    pub fn active_pid(&self) -> Option<u32> {
        self.state.lock().active.as_ref().map(|a| a.pid)
    }

    /// Whether the current sampling task is still running
    pub fn is_sampling(&self) -> bool {
        self.state
            .lock()
            .active
            .as_ref()
            .is_some_and(|a| !a.task.is_finished())
    }

    /// Cancel the current task and wait up to `grace` for it to finish
    pub async fn shutdown(&self, grace: Duration) {
        let active = {
            let mut state = self.state.lock();
            self.supersede();
            state.active.take()
        };

        let Some(active) = active else {
            return;
        };

        active.cancel.cancel();
        if tokio::time::timeout(grace, active.task).await.is_err() {
            log::warn!(
                "Frame rate sampling for pid {} did not stop within {:?}",
                active.pid,
                grace
            );
        }
    }

    /// Invalidate every outstanding sink and zero the published value
    fn supersede(&self) -> u64 {
        let mut slot = self.slot.lock();
        slot.generation += 1;
        slot.fps = 0.0;
        slot.generation
    }
}

impl Drop for FrameRateTracker {
    fn drop(&mut self) {
        if let Some(active) = self.state.get_mut().active.take() {
            active.cancel.cancel();
        }
    }
}
