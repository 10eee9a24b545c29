// Platform-specific providers

pub mod foreground;
pub mod gpu;
pub mod memory;
pub mod presentmon;
pub mod sensors;

pub use foreground::foreground_watcher;
pub use memory::SystemMemory;
pub use presentmon::PresentMonProvider;
pub use sensors::SystemSensorProvider;
