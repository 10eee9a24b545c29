use crate::core::telemetry::ForegroundWatcher;
use crate::error::Result;

/// Foreground window lookup through user32
#[cfg(windows)]
pub struct WindowsForegroundWatcher;

#[cfg(windows)]
impl ForegroundWatcher for WindowsForegroundWatcher {
    fn foreground_pid(&self) -> Result<u32> {
        use winapi::shared::minwindef::DWORD;
        use winapi::um::winuser::{GetForegroundWindow, GetWindowThreadProcessId};

        unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd.is_null() {
                return Ok(crate::core::telemetry::NO_FOREGROUND_PROCESS);
            }

            let mut pid: DWORD = 0;
            GetWindowThreadProcessId(hwnd, &mut pid);
            Ok(pid)
        }
    }
}

/// The watcher for the current platform
#[cfg(windows)]
pub fn foreground_watcher() -> Result<Box<dyn ForegroundWatcher>> {
    Ok(Box::new(WindowsForegroundWatcher))
}

#[cfg(not(windows))]
pub fn foreground_watcher() -> Result<Box<dyn ForegroundWatcher>> {
    Err(crate::error::LemonError::unsupported(
        "foreground window tracking is only available on Windows",
    ))
}
