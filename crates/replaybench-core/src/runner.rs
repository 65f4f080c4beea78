// Benchmark runner
//
// Sequences one run: resolve the url list, prepare the target, create the
// session, optionally warm up, iterate in the requested mode, then delete the
// session and purge stale sessions. Teardown runs exactly once, whether the
// iteration succeeded or a dispatch failed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::BenchmarkConfig;
use crate::engine::{IterationEngine, IterationMode, IterationPlan, IterationStats};
use crate::environment::EnvironmentBuilder;
use crate::error::{BenchError, Result};
use crate::reclaim::NoopReclaimer;
use crate::report::{BenchmarkReport, ReportSummary};
use crate::session::{SessionHandle, SessionManager};
use crate::spec::ResolvedUrlList;
use crate::traits::{DataCollector, Dispatcher, MemoryReclaimController};

/// What a run does with the resolved url list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "order")]
pub enum RunMode {
    /// Timed iteration with one report per segment
    Measured(IterationMode),
    /// Iteration without timing, optionally wrapped in the data collector
    Unmeasured(IterationMode),
    /// Each url once, unmeasured, to prime caches
    Warmup,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Measured(order) => write!(f, "measured {}", order),
            RunMode::Unmeasured(order) => write!(f, "unmeasured {}", order),
            RunMode::Warmup => write!(f, "warmup"),
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub benchmark: String,
    pub mode: RunMode,
    pub urls: usize,
    pub iterations: u64,
    pub gc_frequency: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warmup: Option<IterationStats>,
    pub stats: IterationStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportSummary>,
    pub stale_sessions_removed: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

struct Execution {
    warmup: Option<IterationStats>,
    stats: IterationStats,
    report: Option<ReportSummary>,
}

/// Drives benchmark runs against one target
pub struct BenchmarkRunner {
    config: BenchmarkConfig,
    dispatcher: Arc<dyn Dispatcher>,
    reclaimer: Arc<dyn MemoryReclaimController>,
    sessions: SessionManager,
    collector: Option<Arc<dyn DataCollector>>,
}

impl BenchmarkRunner {
    pub fn new(config: BenchmarkConfig, dispatcher: Arc<dyn Dispatcher>, sessions: SessionManager) -> Self {
        Self {
            config,
            dispatcher,
            reclaimer: Arc::new(NoopReclaimer),
            sessions,
            collector: None,
        }
    }

    /// Use the target runtime's collector instead of the no-op one
    pub fn with_reclaimer(mut self, reclaimer: Arc<dyn MemoryReclaimController>) -> Self {
        self.reclaimer = reclaimer;
        self
    }

    /// Profiling hook for unmeasured runs; only used when `config.profile` is set
    pub fn with_collector(mut self, collector: Arc<dyn DataCollector>) -> Self {
        self.collector = Some(collector);
        self
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Resolve `name`, rejecting names that expand to no urls
    pub fn resolve(&self, name: &str) -> Result<ResolvedUrlList> {
        let urls = self.config.url_spec.resolve_list(name)?;
        if urls.is_empty() {
            return Err(BenchError::no_urls(name));
        }
        Ok(urls)
    }

    /// Execute one run of benchmark `name`
    pub async fn run(&self, name: &str, mode: RunMode) -> Result<RunSummary> {
        let urls = self.resolve(name)?;
        tracing::info!(
            benchmark = %name,
            urls = urls.len(),
            iterations = self.config.iterations,
            gc_frequency = self.config.gc_frequency,
            mode = %mode,
            "Starting benchmark run"
        );

        let started_at = Utc::now();
        let builder = EnvironmentBuilder::new(self.config.request_base.clone());
        self.dispatcher.prepare(&self.config.target).await?;

        let session = self.sessions.create_session(&self.config.session_data).await?;
        let outcome = self.execute(&urls, &builder, &session, mode).await;
        let teardown = self.teardown(session).await;

        let (execution, stale_sessions_removed) = match (outcome, teardown) {
            (Ok(execution), Ok(removed)) => (execution, removed),
            (Err(e), Ok(_)) => return Err(e),
            (Ok(_), Err(e)) => return Err(e),
            (Err(e), Err(teardown_err)) => {
                tracing::error!(error = %teardown_err, "Session teardown failed after aborted run");
                return Err(e);
            }
        };

        tracing::info!(
            benchmark = %name,
            dispatches = execution.stats.dispatches,
            forced_collections = execution.stats.forced_collections,
            "Benchmark run complete"
        );

        Ok(RunSummary {
            benchmark: name.to_string(),
            mode,
            urls: urls.len(),
            iterations: self.config.iterations,
            gc_frequency: self.config.gc_frequency,
            warmup: execution.warmup,
            stats: execution.stats,
            report: execution.report,
            stale_sessions_removed,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn execute(
        &self,
        urls: &ResolvedUrlList,
        builder: &EnvironmentBuilder,
        session: &SessionHandle,
        mode: RunMode,
    ) -> Result<Execution> {
        let mut engine = IterationEngine::new(self.dispatcher.as_ref(), self.reclaimer.as_ref(), builder);

        let (order, measured) = match mode {
            RunMode::Warmup => {
                let stats = engine.warm_up(urls, session).await?;
                return Ok(Execution {
                    warmup: None,
                    stats,
                    report: None,
                });
            }
            RunMode::Measured(order) => (order, true),
            RunMode::Unmeasured(order) => (order, false),
        };

        let warmup = if self.config.warmup {
            Some(engine.warm_up(urls, session).await?)
        } else {
            None
        };

        let plan = IterationPlan::new(self.config.iterations, self.config.gc_frequency, order)?;

        if measured {
            let report = BenchmarkReport::new(urls.name());
            let stats = engine.iterate(&plan, urls, session, Some(&report)).await?;
            return Ok(Execution {
                warmup,
                stats,
                report: Some(report.summary()),
            });
        }

        let collector = self.collector.as_ref().filter(|_| self.config.profile);
        if let Some(collector) = collector {
            collector.start();
        }
        let result = engine.iterate(&plan, urls, session, None).await;
        if let Some(collector) = collector {
            collector.stop();
        }

        Ok(Execution {
            warmup,
            stats: result?,
            report: None,
        })
    }

    async fn teardown(&self, session: SessionHandle) -> Result<u64> {
        let deleted = self.sessions.delete_session(session).await;
        let purged = self.sessions.delete_stale_sessions().await;
        deleted?;
        purged
    }
}
