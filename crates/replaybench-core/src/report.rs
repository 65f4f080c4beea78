//! Timing reports
//!
//! Collects one entry per measured segment and renders them as a text table
//! or a serializable summary.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;

use crate::traits::TimingReporter;

/// Timing of one measured segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub label: String,
    pub dispatches: u64,
    pub total_secs: f64,
    pub mean_ms: f64,
    pub requests_per_sec: f64,
}

impl ReportEntry {
    pub fn new(label: impl Into<String>, elapsed: Duration, dispatches: u64) -> Self {
        let total_secs = elapsed.as_secs_f64();
        let (mean_ms, requests_per_sec) = if dispatches == 0 {
            (0.0, 0.0)
        } else if total_secs == 0.0 {
            (0.0, f64::INFINITY)
        } else {
            (
                total_secs * 1000.0 / dispatches as f64,
                dispatches as f64 / total_secs,
            )
        };

        Self {
            label: label.into(),
            dispatches,
            total_secs,
            mean_ms,
            requests_per_sec,
        }
    }
}

/// Serializable view of a finished report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub benchmark: String,
    pub entries: Vec<ReportEntry>,
    pub total_dispatches: u64,
    pub total_secs: f64,
}

impl ReportSummary {
    /// Render the entries as an aligned table
    pub fn render_text(&self) -> String {
        let entries = &self.entries;
        let label_width = entries
            .iter()
            .map(|e| e.label.len())
            .max()
            .unwrap_or(0)
            .max("label".len());

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<label_width$}  {:>10}  {:>10}  {:>10}  {:>10}",
            "label", "requests", "total s", "mean ms", "req/s"
        );
        for entry in entries {
            let _ = writeln!(
                out,
                "{:<label_width$}  {:>10}  {:>10.3}  {:>10.3}  {:>10.1}",
                entry.label, entry.dispatches, entry.total_secs, entry.mean_ms, entry.requests_per_sec
            );
        }
        out
    }
}

/// Report collecting entries from the engine
#[derive(Debug)]
pub struct BenchmarkReport {
    name: String,
    entries: Mutex<Vec<ReportEntry>>,
}

impl BenchmarkReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entries in the order they were reported
    pub fn entries(&self) -> Vec<ReportEntry> {
        self.entries.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn summary(&self) -> ReportSummary {
        let entries = self.entries();
        ReportSummary {
            benchmark: self.name.clone(),
            total_dispatches: entries.iter().map(|e| e.dispatches).sum(),
            total_secs: entries.iter().map(|e| e.total_secs).sum(),
            entries,
        }
    }

    /// Render the entries as an aligned table
    pub fn render_text(&self) -> String {
        self.summary().render_text()
    }
}

impl TimingReporter for BenchmarkReport {
    fn report(&self, label: &str, elapsed: Duration, dispatches: u64) {
        let entry = ReportEntry::new(label, elapsed, dispatches);
        tracing::info!(
            benchmark = %self.name,
            label = %entry.label,
            requests = entry.dispatches,
            total_secs = entry.total_secs,
            mean_ms = entry.mean_ms,
            "Segment complete"
        );
        self.entries.lock().push(entry);
    }
}
