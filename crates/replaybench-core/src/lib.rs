// Request-Replay Benchmark Engine
//
// This crate replays named sets of requests against an application's
// request-handling entry point and times them, optionally forcing memory
// reclamation at a fixed cadence so collection cost can be isolated.
//
// Key design decisions:
// - Collaborators are traits (Dispatcher, SessionStore, MemoryReclaimController)
// - Request environments are passed to the dispatcher explicitly
// - Suspended collection is a scoped guard, so automatic collection always comes back
// - Stale session cleanup is a strategy object handed to the SessionManager
// - Dispatches run strictly one after another; there is no concurrent dispatch

pub mod config;
pub mod engine;
pub mod environment;
pub mod error;
pub mod install;
pub mod monitor;
pub mod reclaim;
pub mod report;
pub mod runner;
pub mod session;
pub mod spec;
pub mod telemetry;
pub mod traits;

// In-memory implementations for examples and testing
pub mod memory;

// Re-exports for convenience
pub use config::{BenchmarkConfig, BenchmarkOptions, LegacyFlags, TargetOptions};
pub use engine::{EngineState, IterationEngine, IterationMode, IterationPlan, IterationStats};
pub use environment::{EnvironmentBuilder, RequestBase, RequestEnvironment, SESSION_COOKIE_NAME};
pub use error::{BenchError, Result};
pub use install::{InstallAction, Installer};
pub use monitor::{ResourceMonitor, ResourceSnapshot, ResourceSummary};
pub use reclaim::{CollectionPause, NoopReclaimer};
pub use report::{BenchmarkReport, ReportEntry, ReportSummary};
pub use runner::{BenchmarkRunner, RunMode, RunSummary};
pub use session::{SessionData, SessionHandle, SessionManager};
pub use spec::{RequestDescriptor, ResolvedUrlList, SpecEntry, UrlSpec};
pub use traits::{
    DataCollector, Dispatcher, MemoryReclaimController, NoopCleanup, SessionStore,
    StaleSessionCleanup, TimingReporter,
};
