//! One-shot console report of the hardware metrics.

use anyhow::Result;
use colored::Colorize;

use crate::core::telemetry::{
    MemoryProvider, MetricAggregator, MetricSnapshot, SensorCache, SensorProvider,
    ENABLED_SENSOR_KINDS,
};
use crate::platform::{SystemMemory, SystemSensorProvider};

/// Execute the print command
pub fn execute() -> Result<()> {
    let mut provider = SystemSensorProvider::new();
    provider.open()?;
    let mut memory = SystemMemory::new();

    let sensors = provider.list_sensors(ENABLED_SENSOR_KINDS);
    let mut aggregator = MetricAggregator::new();
    let mut cache = SensorCache::new();

    // CPU load needs two samples some time apart
    aggregator.refresh(&sensors, &mut provider, memory.memory(), &mut cache, 0);
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    cache.clear();
    aggregator.refresh(&sensors, &mut provider, memory.memory(), &mut cache, 0);

    print_metrics(aggregator.metrics());
    provider.close();
    Ok(())
}

fn print_metrics(metrics: &MetricSnapshot) {
    println!("{}", "Memory".bold());
    println!("  RAM Total:      {} MB", metrics.total_memory_mb);
    println!("  RAM Available:  {} MB", metrics.available_memory_mb);
    println!("  RAM Usage:      {:.2}%", metrics.memory_usage_percent());
    println!();

    println!("{}", "CPU".bold());
    println!("  Name:           {}", display_name(&metrics.cpu_name));
    println!("  Temperature:    {:.2}°C", metrics.cpu_temp_c);
    println!("  Load:           {:.2}%", metrics.cpu_load_pct);
    println!();

    println!("{}", "GPU".bold());
    println!("  Name:           {}", display_name(&metrics.gpu_name));
    println!("  Temperature:    {:.2}°C", metrics.gpu_temp_c);
    println!("  Load:           {:.2}%", metrics.gpu_load_pct);
    println!("  Total VRAM:     {} MB", metrics.gpu_total_vram_mb);
    println!("  Available VRAM: {} MB", metrics.gpu_avail_vram_mb);
}

fn display_name(name: &str) -> colored::ColoredString {
    if name.is_empty() {
        "not detected".dimmed()
    } else {
        name.cyan()
    }
}
