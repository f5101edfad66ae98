//! Live OS-query metrics source backed by sysinfo.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sysinfo::{Disks, System};
use tokio::sync::Mutex;
use tracing::trace;

use crate::Sample;

use super::{METRIC_CPU, METRIC_DISK, METRIC_MEMORY, MetricsSource, SourceUnavailable};

/// Samples CPU, memory and disk usage percentages from the local host.
///
/// CPU usage needs two refreshes with a minimum delay in between to produce a
/// meaningful delta, so each sample spans `sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`.
pub struct SystemSource {
    sys: Mutex<System>,
}

impl SystemSource {
    pub fn new() -> Self {
        Self {
            sys: Mutex::new(System::new_all()),
        }
    }
}

impl Default for SystemSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsSource for SystemSource {
    async fn sample(&self) -> Result<Sample, SourceUnavailable> {
        let mut sys = self.sys.lock().await;

        sys.refresh_all();
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        sys.refresh_all();

        let cpus = sys.cpus();
        if cpus.is_empty() {
            return Err(SourceUnavailable::new("no CPUs reported by the OS"));
        }

        let total_memory = sys.total_memory();
        if total_memory == 0 {
            return Err(SourceUnavailable::new("total memory reported as zero"));
        }

        let cpu_usage =
            cpus.iter().map(|cpu| cpu.cpu_usage()).sum::<f32>() / cpus.len() as f32;
        let memory_usage = sys.used_memory() as f64 / total_memory as f64 * 100.0;

        let mut readings = BTreeMap::new();
        readings.insert(METRIC_CPU.to_string(), f64::from(cpu_usage));
        readings.insert(METRIC_MEMORY.to_string(), memory_usage);

        // Report the fullest mounted disk; hosts without disks omit the reading.
        let disks = Disks::new_with_refreshed_list();
        let disk_usage = disks
            .iter()
            .filter(|disk| disk.total_space() > 0)
            .map(|disk| {
                let total = disk.total_space() as f64;
                let used = total - disk.available_space() as f64;
                used / total * 100.0
            })
            .fold(None, |peak: Option<f64>, usage| {
                Some(peak.map_or(usage, |p| p.max(usage)))
            });

        if let Some(usage) = disk_usage {
            readings.insert(METRIC_DISK.to_string(), usage);
        }

        trace!("collected system sample: {readings:?}");

        Ok(Sample::new(readings))
    }

    fn name(&self) -> &str {
        "system"
    }
}
