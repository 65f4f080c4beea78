// Core traits for pluggable collaborators
//
// These traits let the benchmark engine drive different targets and backends:
// - In-process targets or an HTTP replay client behind Dispatcher
// - In-memory or database-backed session stores
// - Runtime-specific collectors behind MemoryReclaimController

use async_trait::async_trait;
use std::time::Duration;

use crate::config::TargetOptions;
use crate::environment::RequestEnvironment;
use crate::error::Result;
use crate::session::SessionData;

// ============================================================================
// Dispatcher - The target application under test
// ============================================================================

/// Request-handling entry point of the application being benchmarked
///
/// The engine awaits each call before issuing the next one, so an
/// implementation never sees overlapping requests.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Apply pass-through target toggles. Called once per run before the
    /// first dispatch.
    async fn prepare(&self, _options: &TargetOptions) -> Result<()> {
        Ok(())
    }

    /// Handle one request described by `env`
    async fn dispatch(&self, env: &RequestEnvironment) -> Result<()>;
}

// ============================================================================
// MemoryReclaimController - Forced collection capability
// ============================================================================

/// Control over the target runtime's memory reclamation
///
/// The engine only calls these through [`crate::reclaim::CollectionPause`],
/// which guarantees `resume` runs when a measured segment ends.
pub trait MemoryReclaimController: Send + Sync {
    /// Run a full, synchronous collection now
    fn force_collect_now(&self);

    /// Suspend automatic collection
    fn pause(&self);

    /// Restore automatic collection
    fn resume(&self);
}

// ============================================================================
// SessionStore - Persistence for the synthetic benchmark session
// ============================================================================

/// Backend holding the session the benchmark requests carry in their cookie
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Start a brand new session holding `data` and return its identifier.
    /// Implementations must never resume an existing session.
    async fn create_session(&self, data: &SessionData) -> Result<String>;

    /// Remove the session
    async fn delete_session(&self, session_id: &str) -> Result<()>;
}

/// Post-run purge of sessions the target created on its own during a run
///
/// Returns the number of sessions removed.
#[async_trait]
pub trait StaleSessionCleanup: Send + Sync {
    async fn delete_stale_sessions(&self) -> Result<u64>;
}

/// Cleanup strategy that leaves the store untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCleanup;

#[async_trait]
impl StaleSessionCleanup for NoopCleanup {
    async fn delete_stale_sessions(&self) -> Result<u64> {
        Ok(0)
    }
}

// ============================================================================
// Reporting hooks
// ============================================================================

/// Receives one timing per measured segment
pub trait TimingReporter: Send + Sync {
    /// Record that `dispatches` requests under `label` took `elapsed`
    fn report(&self, label: &str, elapsed: Duration, dispatches: u64);
}

/// Profiling hook wrapped around unmeasured runs
pub trait DataCollector: Send + Sync {
    fn start(&self);
    fn stop(&self);
}
