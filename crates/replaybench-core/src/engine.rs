// GC-controlled iteration engine
//
// Turns a resolved url list and an iteration plan into a fixed sequence of
// dispatches. With a non-zero GC frequency every measured segment starts with
// a forced collection, runs with automatic collection suspended, and forces
// another collection after every `gc_frequency` dispatches.
//
// Per-url mode resets the dispatch counter for each descriptor. Url-mix mode
// counts across the whole run. The asymmetry is long-standing behavior that
// existing benchmark numbers depend on, so it is kept as is.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::environment::EnvironmentBuilder;
use crate::error::{BenchError, Result};
use crate::reclaim::CollectionPause;
use crate::session::SessionHandle;
use crate::spec::ResolvedUrlList;
use crate::traits::{Dispatcher, MemoryReclaimController, TimingReporter};

/// Iteration order of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationMode {
    /// Each descriptor `iterations` times in a row, one report per descriptor
    PerUrl,
    /// The whole list `iterations` times over, one aggregate report
    UrlMix,
}

impl std::fmt::Display for IterationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IterationMode::PerUrl => write!(f, "per_url"),
            IterationMode::UrlMix => write!(f, "url_mix"),
        }
    }
}

/// How many times to dispatch, and how often to force a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationPlan {
    iterations: u64,
    gc_frequency: u64,
    mode: IterationMode,
}

impl IterationPlan {
    /// `gc_frequency` 0 disables collection control entirely
    pub fn new(iterations: u64, gc_frequency: u64, mode: IterationMode) -> Result<Self> {
        if iterations == 0 {
            return Err(BenchError::config("iterations must be at least 1"));
        }
        Ok(Self {
            iterations,
            gc_frequency,
            mode,
        })
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn gc_frequency(&self) -> u64 {
        self.gc_frequency
    }

    pub fn mode(&self) -> IterationMode {
        self.mode
    }

    fn gc_controlled(&self) -> bool {
        self.gc_frequency > 0
    }
}

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Warming,
    Iterating,
    Reporting,
    Done,
}

/// Counters for one engine pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationStats {
    pub dispatches: u64,
    pub forced_collections: u64,
    pub segments: u64,
}

/// Executes dispatch sequences against one target
pub struct IterationEngine<'a> {
    dispatcher: &'a dyn Dispatcher,
    reclaimer: &'a dyn MemoryReclaimController,
    builder: &'a EnvironmentBuilder,
    state: EngineState,
}

impl<'a> IterationEngine<'a> {
    pub fn new(
        dispatcher: &'a dyn Dispatcher,
        reclaimer: &'a dyn MemoryReclaimController,
        builder: &'a EnvironmentBuilder,
    ) -> Self {
        Self {
            dispatcher,
            reclaimer,
            builder,
            state: EngineState::Idle,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    fn transition(&mut self, next: EngineState) {
        tracing::debug!(from = ?self.state, to = ?next, "Engine state change");
        self.state = next;
    }

    /// Dispatch every descriptor once, unmeasured and without collection control
    pub async fn warm_up(
        &mut self,
        urls: &ResolvedUrlList,
        session: &SessionHandle,
    ) -> Result<IterationStats> {
        if urls.is_empty() {
            return Err(BenchError::no_urls(urls.name()));
        }

        self.transition(EngineState::Warming);
        let mut stats = IterationStats::default();
        for descriptor in urls.iter() {
            let env = self.builder.build(descriptor, session);
            self.dispatcher.dispatch(&env).await?;
            stats.dispatches += 1;
        }
        tracing::debug!(benchmark = %urls.name(), dispatches = stats.dispatches, "Warm-up complete");
        self.transition(EngineState::Done);

        Ok(stats)
    }

    /// Run the plan. Each measured segment is reported when `reporter` is set.
    ///
    /// A dispatch error aborts immediately and is returned unchanged; the
    /// unfinished segment is not reported.
    pub async fn iterate(
        &mut self,
        plan: &IterationPlan,
        urls: &ResolvedUrlList,
        session: &SessionHandle,
        reporter: Option<&dyn TimingReporter>,
    ) -> Result<IterationStats> {
        if urls.is_empty() {
            return Err(BenchError::no_urls(urls.name()));
        }

        self.transition(EngineState::Iterating);
        let stats = match plan.mode() {
            IterationMode::PerUrl => self.iterate_per_url(plan, urls, session, reporter).await?,
            IterationMode::UrlMix => self.iterate_url_mix(plan, urls, session, reporter).await?,
        };
        self.transition(EngineState::Done);

        Ok(stats)
    }

    async fn iterate_per_url(
        &mut self,
        plan: &IterationPlan,
        urls: &ResolvedUrlList,
        session: &SessionHandle,
        reporter: Option<&dyn TimingReporter>,
    ) -> Result<IterationStats> {
        let mut stats = IterationStats::default();

        for descriptor in urls.iter() {
            let env = self.builder.build(descriptor, session);
            let mut pause = plan
                .gc_controlled()
                .then(|| CollectionPause::begin(self.reclaimer));
            let mut request_count = 0;

            let started = Instant::now();
            for _ in 0..plan.iterations() {
                self.dispatcher.dispatch(&env).await?;
                if let Some(pause) = pause.as_mut() {
                    request_count += 1;
                    if request_count == plan.gc_frequency() {
                        pause.collect();
                        request_count = 0;
                    }
                }
            }
            let elapsed = started.elapsed();

            stats.forced_collections += pause.map_or(0, |pause| pause.forced());
            stats.dispatches += plan.iterations();
            stats.segments += 1;

            self.report(reporter, &descriptor.uri, elapsed, plan.iterations());
        }

        Ok(stats)
    }

    async fn iterate_url_mix(
        &mut self,
        plan: &IterationPlan,
        urls: &ResolvedUrlList,
        session: &SessionHandle,
        reporter: Option<&dyn TimingReporter>,
    ) -> Result<IterationStats> {
        let label = format!("url_mix ({} urls)", urls.len());
        let mut pause = plan
            .gc_controlled()
            .then(|| CollectionPause::begin(self.reclaimer));
        let mut request_count = 0;
        let mut dispatches = 0;

        let started = Instant::now();
        for _ in 0..plan.iterations() {
            for descriptor in urls.iter() {
                let env = self.builder.build(descriptor, session);
                self.dispatcher.dispatch(&env).await?;
                dispatches += 1;
                if let Some(pause) = pause.as_mut() {
                    request_count += 1;
                    if request_count == plan.gc_frequency() {
                        pause.collect();
                        request_count = 0;
                    }
                }
            }
        }
        let elapsed = started.elapsed();

        let stats = IterationStats {
            dispatches,
            forced_collections: pause.map_or(0, |pause| pause.forced()),
            segments: 1,
        };
        self.report(reporter, &label, elapsed, dispatches);

        Ok(stats)
    }

    fn report(
        &mut self,
        reporter: Option<&dyn TimingReporter>,
        label: &str,
        elapsed: Duration,
        dispatches: u64,
    ) {
        let Some(reporter) = reporter else {
            return;
        };
        self.transition(EngineState::Reporting);
        reporter.report(label, elapsed, dispatches);
        self.transition(EngineState::Iterating);
    }
}
