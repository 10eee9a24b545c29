use std::io;
use thiserror::Error;

/// Custom error type for the telemetry server
#[derive(Error, Debug)]
pub enum LemonError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Platform not supported: {0}")]
    Unsupported(String),

    #[error("Sensor provider error: {0}")]
    SensorProvider(String),

    #[error("GPU not available: {0}")]
    GpuNotAvailable(String),

    #[error("Frame rate sampling failed: {0}")]
    Sampling(String),
}

/// Result type alias for the telemetry server
pub type Result<T> = std::result::Result<T, LemonError>;

impl LemonError {
    /// Create an unsupported platform error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        LemonError::Unsupported(msg.into())
    }

    pub fn sensor_provider<S: Into<String>>(msg: S) -> Self {
        LemonError::SensorProvider(msg.into())
    }

    pub fn gpu_not_available<S: Into<String>>(msg: S) -> Self {
        LemonError::GpuNotAvailable(msg.into())
    }

    pub fn sampling<S: Into<String>>(msg: S) -> Self {
        LemonError::Sampling(msg.into())
    }
}
