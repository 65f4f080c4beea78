//! Process resource sampling
//!
//! Used as the profiling hook around unmeasured runs: samples resident memory
//! and CPU usage of the benchmark process when collection starts and stops.
//! CPU usage is relative to the previous sample, so the first one reads 0.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};

use crate::traits::DataCollector;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One reading of the benchmark process
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// Milliseconds since the monitor was created
    pub at_ms: u64,
    pub rss_mb: f64,
    pub cpu_percent: f32,
}

/// What a profiled run used, derived from its snapshots
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub samples: usize,
    pub peak_rss_mb: f64,
    pub rss_growth_mb: f64,
    pub peak_cpu_percent: f32,
}

impl ResourceSummary {
    fn from_snapshots(snapshots: &[ResourceSnapshot]) -> Self {
        let (Some(first), Some(last)) = (snapshots.first(), snapshots.last()) else {
            return Self::default();
        };
        Self {
            samples: snapshots.len(),
            peak_rss_mb: snapshots.iter().map(|s| s.rss_mb).fold(0.0, f64::max),
            rss_growth_mb: last.rss_mb - first.rss_mb,
            peak_cpu_percent: snapshots.iter().map(|s| s.cpu_percent).fold(0.0, f32::max),
        }
    }
}

struct Sampler {
    system: System,
    snapshots: Vec<ResourceSnapshot>,
}

/// Samples the current process for the `-svl` profiling hook
pub struct ResourceMonitor {
    created: Instant,
    pid: Pid,
    sampler: Mutex<Sampler>,
}

impl ResourceMonitor {
    pub fn new() -> Self {
        let pid = Pid::from_u32(std::process::id());
        let system = System::new_with_specifics(
            RefreshKind::new().with_processes(ProcessRefreshKind::new().with_memory().with_cpu()),
        );
        Self {
            created: Instant::now(),
            pid,
            sampler: Mutex::new(Sampler {
                system,
                snapshots: Vec::new(),
            }),
        }
    }

    /// Take a reading and keep it
    pub fn sample(&self) -> ResourceSnapshot {
        let mut sampler = self.sampler.lock();
        sampler.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::new().with_memory().with_cpu(),
        );

        let mut snapshot = ResourceSnapshot {
            at_ms: self.created.elapsed().as_millis() as u64,
            ..ResourceSnapshot::default()
        };
        if let Some(process) = sampler.system.process(self.pid) {
            snapshot.rss_mb = process.memory() as f64 / BYTES_PER_MB;
            snapshot.cpu_percent = process.cpu_usage();
        }
        sampler.snapshots.push(snapshot);
        snapshot
    }

    pub fn snapshots(&self) -> Vec<ResourceSnapshot> {
        self.sampler.lock().snapshots.clone()
    }

    pub fn summary(&self) -> ResourceSummary {
        ResourceSummary::from_snapshots(&self.sampler.lock().snapshots)
    }
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl DataCollector for ResourceMonitor {
    fn start(&self) {
        self.sampler.lock().snapshots.clear();
        self.sample();
    }

    fn stop(&self) {
        self.sample();
        let summary = self.summary();
        tracing::info!(
            peak_rss_mb = summary.peak_rss_mb,
            rss_growth_mb = summary.rss_growth_mb,
            peak_cpu_percent = summary.peak_cpu_percent,
            "Data collection stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_clears_earlier_samples() {
        let monitor = ResourceMonitor::new();
        monitor.sample();

        monitor.start();
        monitor.stop();

        let snapshots = monitor.snapshots();
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots[0].at_ms <= snapshots[1].at_ms);
        assert!(snapshots[1].rss_mb > 0.0);
        assert_eq!(monitor.summary().samples, 2);
    }

    #[test]
    fn test_summary_peaks_and_growth() {
        let snapshots = [
            ResourceSnapshot { at_ms: 0, rss_mb: 40.0, cpu_percent: 0.0 },
            ResourceSnapshot { at_ms: 5, rss_mb: 55.0, cpu_percent: 80.5 },
            ResourceSnapshot { at_ms: 9, rss_mb: 48.0, cpu_percent: 12.0 },
        ];

        let summary = ResourceSummary::from_snapshots(&snapshots);

        assert_eq!(summary.samples, 3);
        assert_eq!(summary.peak_rss_mb, 55.0);
        assert_eq!(summary.rss_growth_mb, 8.0);
        assert_eq!(summary.peak_cpu_percent, 80.5);
        assert_eq!(ResourceSummary::from_snapshots(&[]), ResourceSummary::default());
    }
}
