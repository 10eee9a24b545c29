use crate::error::Result;

/// Pid reported when no window has focus
pub const NO_FOREGROUND_PROCESS: u32 = 0;

/// Trait for the OS query identifying the foreground process
pub trait ForegroundWatcher: Send {
    /// Pid owning the focused window, or `NO_FOREGROUND_PROCESS`
    fn foreground_pid(&self) -> Result<u32>;
}
