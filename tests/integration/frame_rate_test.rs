use super::fakes::{settle, EchoFrameRate};
use lemon_server::core::telemetry::{FrameRateTracker, NO_FOREGROUND_PROCESS};
use lemon_server::platform::PresentMonProvider;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rapid_switches_settle_on_last_process() {
    let provider = EchoFrameRate::default();
    let tracker = FrameRateTracker::new(Arc::new(provider.clone()), Handle::current());

    tracker.on_foreground_process_changed(101);
    tracker.on_foreground_process_changed(202);
    tracker.on_foreground_process_changed(303);
    settle().await;

    assert_eq!(provider.started(), vec![101, 202, 303]);
    assert_eq!(tracker.active_pid(), Some(303));
    assert_eq!(tracker.current_fps(), 303.0);
    // Earlier tasks have observed their cancellation
    assert_eq!(provider.running(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stale_task_cannot_overwrite_successor() {
    let provider = EchoFrameRate {
        stubborn: vec![1],
        stubborn_for: Duration::from_millis(150),
        ..EchoFrameRate::default()
    };
    let tracker = FrameRateTracker::new(Arc::new(provider.clone()), Handle::current());

    tracker.on_foreground_process_changed(1);
    settle().await;
    assert_eq!(tracker.current_fps(), 1.0);

    tracker.on_foreground_process_changed(2);

    // The pid 1 task keeps pushing until its deadline; none of it may land
    for _ in 0..40 {
        let fps = tracker.current_fps();
        assert!(fps == 0.0 || fps == 2.0, "stale sample {} published", fps);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // Its final reset does not zero the successor either
    settle().await;
    assert_eq!(tracker.active_pid(), Some(2));
    assert_eq!(tracker.current_fps(), 2.0);
}

#[tokio::test]
async fn test_idle_after_focus_leaves_every_process() {
    let provider = EchoFrameRate::default();
    let tracker = FrameRateTracker::new(Arc::new(provider.clone()), Handle::current());

    tracker.on_foreground_process_changed(55);
    settle().await;
    tracker.on_foreground_process_changed(NO_FOREGROUND_PROCESS);
    settle().await;

    assert_eq!(tracker.active_pid(), None);
    assert!(!tracker.is_sampling());
    assert_eq!(tracker.current_fps(), 0.0);
    assert_eq!(provider.running(), 0);
}

#[tokio::test]
async fn test_missing_presentmon_binary_reports_zero() {
    let provider = PresentMonProvider::new(
        PathBuf::from("/definitely/not/here/PresentMon"),
        Duration::from_millis(10),
    );
    let tracker = FrameRateTracker::new(Arc::new(provider), Handle::current());

    tracker.on_foreground_process_changed(4242);
    settle().await;

    assert_eq!(tracker.active_pid(), Some(4242));
    assert!(!tracker.is_sampling());
    assert_eq!(tracker.current_fps(), 0.0);
}

#[tokio::test]
async fn test_shutdown_waits_for_cooperative_task() {
    let provider = EchoFrameRate::default();
    let tracker = FrameRateTracker::new(Arc::new(provider.clone()), Handle::current());

    tracker.on_foreground_process_changed(8);
    settle().await;
    tracker.shutdown(Duration::from_millis(500)).await;

    assert_eq!(provider.running(), 0);
    assert_eq!(tracker.current_fps(), 0.0);
}
