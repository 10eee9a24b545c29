//! Frame-rate provider driving the PresentMon console tool.
//!
//! PresentMon is started for one pid with CSV output on stdout. Each row is a
//! presented frame; its frame duration feeds a rolling one-second window and
//! the resulting rate is published at most once per sampling period.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use futures_util::future::{BoxFuture, FutureExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::core::telemetry::{FpsSink, FrameRateProvider};
use crate::error::{LemonError, Result};

const BINARY_NAMES: &[&str] = &["PresentMon", "presentmon", "PresentMon64"];
const SESSION_NAME: &str = "lemon-server";
const WINDOW_MS: f64 = 1000.0;

/// Frame-duration columns, oldest PresentMon naming first
const FRAME_TIME_COLUMNS: &[&str] = &["msBetweenPresents", "MsBetweenPresents", "FrameTime"];

/// Rolling window of frame durations
#[derive(Debug, Clone)]
pub struct FrameWindow {
    frames: VecDeque<f64>,
    total_ms: f64,
    window_ms: f64,
}

impl FrameWindow {
    pub fn new(window_ms: f64) -> Self {
        Self {
            frames: VecDeque::new(),
            total_ms: 0.0,
            window_ms,
        }
    }

    pub fn push(&mut self, frame_ms: f64) {
        self.frames.push_back(frame_ms);
        self.total_ms += frame_ms;

        while self.frames.len() > 1 && self.total_ms > self.window_ms {
            if let Some(oldest) = self.frames.pop_front() {
                self.total_ms -= oldest;
            }
        }
    }

    pub fn fps(&self) -> f32 {
        if self.total_ms <= 0.0 {
            return 0.0;
        }
        (self.frames.len() as f64 * 1000.0 / self.total_ms) as f32
    }
}

/// Position of the frame-duration column in PresentMon's CSV
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTimeColumn(usize);

impl FrameTimeColumn {
    pub fn from_header(line: &str) -> Option<Self> {
        let columns: Vec<&str> = line.split(',').map(str::trim).collect();
        FRAME_TIME_COLUMNS
            .iter()
            .find_map(|name| columns.iter().position(|c| c == name))
            .map(FrameTimeColumn)
    }

    /// Frame duration in ms, `None` for malformed rows and repeated headers
    pub fn parse(&self, line: &str) -> Option<f64> {
        line.split(',')
            .nth(self.0)?
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|ms| ms.is_finite() && *ms > 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// PresentMon closed its output
    Eof,
    Cancelled,
    /// The receiving side no longer accepts samples
    Superseded,
}

/// Consume PresentMon CSV rows and publish the frame rate
pub async fn stream_frames<R, F>(
    reader: R,
    period: Duration,
    cancel: &CancellationToken,
    mut publish: F,
) -> Result<StreamEnd>
where
    R: AsyncBufRead + Unpin,
    F: FnMut(f32) -> bool,
{
    let mut lines = reader.lines();
    let mut column: Option<FrameTimeColumn> = None;
    let mut window = FrameWindow::new(WINDOW_MS);
    let mut last_publish: Option<Instant> = None;

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => return Ok(StreamEnd::Cancelled),
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            return Ok(StreamEnd::Eof);
        };

        let Some(col) = column else {
            column = FrameTimeColumn::from_header(&line);
            if column.is_none() {
                log::trace!("Skipping PresentMon preamble: {}", line);
            }
            continue;
        };

        let Some(frame_ms) = col.parse(&line) else {
            continue;
        };
        window.push(frame_ms);

        let due = last_publish.map_or(true, |at| at.elapsed() >= period);
        if due {
            if !publish(window.fps()) {
                return Ok(StreamEnd::Superseded);
            }
            last_publish = Some(Instant::now());
        }
    }
}

/// Frame-rate provider backed by a PresentMon executable
#[derive(Debug, Clone)]
pub struct PresentMonProvider {
    binary: PathBuf,
    period: Duration,
}

impl PresentMonProvider {
    pub fn new(binary: PathBuf, period: Duration) -> Self {
        Self { binary, period }
    }

    /// Use `configured` when given, otherwise search PATH
    pub fn locate(configured: Option<&str>, period: Duration) -> Result<Self> {
        if let Some(path) = configured {
            let path = Path::new(path);
            if path.is_file() {
                return Ok(Self::new(path.to_path_buf(), period));
            }
            return Err(LemonError::unsupported(format!(
                "PresentMon not found at {}",
                path.display()
            )));
        }

        BINARY_NAMES
            .iter()
            .find_map(|name| which::which(name).ok())
            .map(|binary| Self::new(binary, period))
            .ok_or_else(|| {
                LemonError::unsupported("PresentMon not found on PATH; set presentmon_path")
            })
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self, pid: u32) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg("--process_id")
            .arg(pid.to_string())
            .args([
                "--output_stdout",
                "--stop_existing_session",
                "--terminate_on_proc_exit",
                "--session_name",
                SESSION_NAME,
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }

    /// Command stopping the trace session left behind by a killed sampler
    fn stop_session_command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args([
                "--terminate_existing_session",
                "--session_name",
                SESSION_NAME,
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

impl FrameRateProvider for PresentMonProvider {
    fn sample(
        &self,
        pid: u32,
        sink: FpsSink,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<()>> {
        let mut command = self.command(pid);
        let binary = self.binary.clone();
        let period = self.period;

        async move {
            let mut child = command.spawn().map_err(|e| {
                LemonError::sampling(format!("Failed to start {}: {}", binary.display(), e))
            })?;
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| LemonError::sampling("PresentMon stdout unavailable"))?;

            let end = stream_frames(BufReader::new(stdout), period, &cancel, |fps| {
                sink.push(fps)
            })
            .await;

            match end {
                Ok(StreamEnd::Eof) => {
                    let status = child.wait().await?;
                    if status.success() {
                        Ok(())
                    } else {
                        Err(LemonError::sampling(format!(
                            "PresentMon exited with {}",
                            status
                        )))
                    }
                }
                Ok(StreamEnd::Cancelled) | Ok(StreamEnd::Superseded) => {
                    child.kill().await?;
                    Ok(())
                }
                Err(e) => {
                    let _ = child.kill().await;
                    Err(e)
                }
            }
        }
        .boxed()
    }

    fn close(&self) -> BoxFuture<'static, Result<()>> {
        let mut command = self.stop_session_command();
        let binary = self.binary.clone();

        async move {
            let status = command.status().await.map_err(|e| {
                LemonError::sampling(format!("Failed to start {}: {}", binary.display(), e))
            })?;
            if !status.success() {
                return Err(LemonError::sampling(format!(
                    "Stopping the PresentMon session exited with {}",
                    status
                )));
            }
            log::debug!("Stopped PresentMon session {}", SESSION_NAME);
            Ok(())
        }
        .boxed()
    }
}
