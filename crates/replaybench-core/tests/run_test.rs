// Integration tests for complete benchmark runs
//
// These tests drive BenchmarkRunner end to end with the in-memory collaborators
// and check dispatch order, session handling and teardown guarantees.

use async_trait::async_trait;
use replaybench_core::{
    memory::{CountingCleanup, InMemorySessionStore, RecordingDispatcher, RecordingReclaimer},
    BenchError, BenchmarkConfig, BenchmarkOptions, BenchmarkRunner, DataCollector, Dispatcher,
    IterationMode, LegacyFlags, RequestEnvironment, RunMode, SessionManager, SessionStore,
    TargetOptions,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const CONFIG: &str = r#"
iterations: 3
server_port: 8080
relative_url_root: /shop
session_data:
  user_id: 7
url_spec:
  home:
    uri: /
  login:
    uri: /login
    new_session: true
  search:
    uri: /search
    query_string: q=boots
  mix: home, login, search
  broken: broken, home
"#;

fn config(flags: &[&str]) -> BenchmarkConfig {
    let options = BenchmarkOptions::from_yaml_str(CONFIG).unwrap();
    BenchmarkConfig::resolve(options, &LegacyFlags::parse(flags)).unwrap()
}

fn runner_with(
    config: BenchmarkConfig,
    dispatcher: Arc<dyn Dispatcher>,
) -> (BenchmarkRunner, Arc<InMemorySessionStore>, Arc<CountingCleanup>) {
    let store = Arc::new(InMemorySessionStore::new());
    let cleanup = Arc::new(CountingCleanup::new(0));
    let sessions = SessionManager::new(store.clone()).with_cleanup(cleanup.clone());
    (BenchmarkRunner::new(config, dispatcher, sessions), store, cleanup)
}

// =============================================================================
// Dispatch order and environments
// =============================================================================

#[tokio::test]
async fn test_url_mix_environments() {
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let (runner, store, _) = runner_with(config(&[]), dispatcher.clone());

    let summary = runner
        .run("mix", RunMode::Measured(IterationMode::UrlMix))
        .await
        .unwrap();

    assert_eq!(summary.stats.dispatches, 9);
    assert_eq!(summary.report.unwrap().entries[0].label, "url_mix (3 urls)");

    let received = dispatcher.received();
    assert_eq!(
        received.iter().take(3).map(|e| e.request_uri.as_str()).collect::<Vec<_>>(),
        vec!["/shop/", "/shop/login", "/shop/search"]
    );

    let home = &received[0];
    assert_eq!(home.server_port, "8080");
    assert!(home.http_cookie.starts_with("_session_id="));

    let login = &received[1];
    assert_eq!(login.http_cookie, "");

    let search = &received[2];
    assert_eq!(search.query_string, "q=boots");
    assert_eq!(search.content_length, 7);

    // every stateful request carried the same session, which is gone now
    let cookies: std::collections::HashSet<_> = received
        .iter()
        .filter(|e| !e.http_cookie.is_empty())
        .map(|e| e.http_cookie.clone())
        .collect();
    assert_eq!(cookies.len(), 1);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_warmup_mode_dispatches_once_in_order() {
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let reclaimer = Arc::new(RecordingReclaimer::new());
    let (runner, _, cleanup) = runner_with(config(&["-gc2"]), dispatcher.clone());
    let runner = runner.with_reclaimer(reclaimer.clone());

    let summary = runner.run("mix", RunMode::Warmup).await.unwrap();

    assert!(summary.report.is_none());
    assert_eq!(dispatcher.uris(), vec!["/shop/", "/shop/login", "/shop/search"]);
    assert!(reclaimer.calls().is_empty());
    assert_eq!(cleanup.calls(), 1);
}

// =============================================================================
// Failure handling
// =============================================================================

#[tokio::test]
async fn test_teardown_runs_once_when_dispatch_fails() {
    let dispatcher = Arc::new(RecordingDispatcher::failing_after(4));
    let reclaimer = Arc::new(RecordingReclaimer::new());
    let (runner, store, cleanup) = runner_with(config(&["-gc2"]), dispatcher.clone());
    let runner = runner.with_reclaimer(reclaimer.clone());

    let err = runner
        .run("mix", RunMode::Measured(IterationMode::PerUrl))
        .await
        .unwrap_err();

    assert!(matches!(err, BenchError::Dispatch(_)));
    assert_eq!(dispatcher.count(), 4);
    assert_eq!(cleanup.calls(), 1);
    assert!(store.is_empty().await);
    assert!(!reclaimer.is_paused());
}

#[tokio::test]
async fn test_cyclic_benchmark_fails_before_setup() {
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let (runner, _, cleanup) = runner_with(config(&[]), dispatcher.clone());

    let err = runner.run("broken", RunMode::Warmup).await.unwrap_err();

    assert!(matches!(err, BenchError::CyclicSpec { .. }));
    assert_eq!(dispatcher.count(), 0);
    assert_eq!(cleanup.calls(), 0);
}

#[tokio::test]
async fn test_unknown_benchmark() {
    let (runner, _, _) = runner_with(config(&[]), Arc::new(RecordingDispatcher::new()));

    let err = runner.run("checkout", RunMode::Warmup).await.unwrap_err();

    assert!(matches!(err, BenchError::UnknownBenchmark(name) if name == "checkout"));
}

// =============================================================================
// Collaborator hooks
// =============================================================================

#[derive(Default)]
struct PreparingDispatcher {
    prepared: parking_lot::Mutex<Option<TargetOptions>>,
    dispatched: AtomicUsize,
}

#[async_trait]
impl Dispatcher for PreparingDispatcher {
    async fn prepare(&self, options: &TargetOptions) -> replaybench_core::Result<()> {
        *self.prepared.lock() = Some(*options);
        Ok(())
    }

    async fn dispatch(&self, _env: &RequestEnvironment) -> replaybench_core::Result<()> {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[tokio::test]
async fn test_target_options_passed_through() {
    let dispatcher = Arc::new(PreparingDispatcher::default());
    let (runner, _, _) = runner_with(config(&["-nocache", "-log"]), dispatcher.clone());

    runner
        .run("home", RunMode::Unmeasured(IterationMode::PerUrl))
        .await
        .unwrap();

    let prepared = (*dispatcher.prepared.lock()).unwrap();
    assert!(!prepared.perform_caching);
    assert!(prepared.log);
    assert!(prepared.cache_template_loading);
    assert_eq!(dispatcher.dispatched.load(Ordering::Relaxed), 3);
}

#[derive(Default)]
struct CountingCollector {
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl DataCollector for CountingCollector {
    fn start(&self) {
        self.starts.fetch_add(1, Ordering::Relaxed);
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::Relaxed);
    }
}

#[tokio::test]
async fn test_collector_wraps_unmeasured_run_only_when_profiling() {
    let collector = Arc::new(CountingCollector::default());

    let (runner, _, _) = runner_with(config(&["-svl"]), Arc::new(RecordingDispatcher::new()));
    let runner = runner.with_collector(collector.clone());
    runner
        .run("home", RunMode::Unmeasured(IterationMode::PerUrl))
        .await
        .unwrap();
    runner
        .run("home", RunMode::Measured(IterationMode::PerUrl))
        .await
        .unwrap();

    let (quiet, _, _) = runner_with(config(&[]), Arc::new(RecordingDispatcher::new()));
    let quiet = quiet.with_collector(collector.clone());
    quiet
        .run("home", RunMode::Unmeasured(IterationMode::PerUrl))
        .await
        .unwrap();

    assert_eq!(collector.starts.load(Ordering::Relaxed), 1);
    assert_eq!(collector.stops.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_session_data_reaches_store() {
    let store = Arc::new(InMemorySessionStore::new());
    let data = config(&[]).session_data;

    let id = store.create_session(&data).await.unwrap();

    assert_eq!(store.get(&id).await.unwrap()["user_id"], serde_json::json!(7));
}
