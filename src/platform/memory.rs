use sysinfo::{MemoryRefreshKind, RefreshKind, System};

use crate::core::telemetry::{MemoryProvider, MemoryReading};

/// Physical memory query through sysinfo
pub struct SystemMemory {
    system: System,
}

impl SystemMemory {
    pub fn new() -> Self {
        let refresh_kind =
            RefreshKind::nothing().with_memory(MemoryRefreshKind::nothing().with_ram());
        Self {
            system: System::new_with_specifics(refresh_kind),
        }
    }
}

impl Default for SystemMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider for SystemMemory {
    fn memory(&mut self) -> Option<MemoryReading> {
        self.system
            .refresh_memory_specifics(MemoryRefreshKind::nothing().with_ram());

        // sysinfo reports bytes
        Some(MemoryReading {
            total_kb: self.system.total_memory() / 1024,
            available_kb: self.system.available_memory() / 1024,
        })
    }
}
