// In-memory implementations for examples and testing
//
// These implementations keep all state in memory, making them useful for:
// - Benchmarking in-process targets that keep sessions in memory
// - Unit and integration tests
// - Quick prototyping

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::environment::RequestEnvironment;
use crate::error::{BenchError, Result};
use crate::session::SessionData;
use crate::traits::{Dispatcher, MemoryReclaimController, SessionStore, StaleSessionCleanup};

// ============================================================================
// InMemorySessionStore - Stores sessions in memory
// ============================================================================

/// In-memory session store
///
/// Stores session data in a HashMap keyed by session ID.
#[derive(Debug, Default, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
}

impl InMemorySessionStore {
    /// Create a new in-memory session store
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the data of a session
    pub async fn get(&self, session_id: &str) -> Option<SessionData> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Clear all sessions
    pub async fn clear(&self) -> u64 {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.len() as u64;
        sessions.clear();
        removed
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self, data: &SessionData) -> Result<String> {
        let session_id = Uuid::now_v7().simple().to_string();
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), data.clone());
        Ok(session_id)
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.sessions
            .write()
            .await
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| BenchError::store(format!("session {session_id} does not exist")))
    }
}

#[async_trait]
impl StaleSessionCleanup for InMemorySessionStore {
    async fn delete_stale_sessions(&self) -> Result<u64> {
        Ok(self.clear().await)
    }
}

// ============================================================================
// CountingCleanup - Records cleanup invocations
// ============================================================================

/// Cleanup strategy that counts its invocations and reports a fixed purge size
#[derive(Debug, Default)]
pub struct CountingCleanup {
    removed_per_call: u64,
    calls: AtomicU64,
}

impl CountingCleanup {
    pub fn new(removed_per_call: u64) -> Self {
        Self {
            removed_per_call,
            calls: AtomicU64::new(0),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl StaleSessionCleanup for CountingCleanup {
    async fn delete_stale_sessions(&self) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.removed_per_call)
    }
}

// ============================================================================
// RecordingDispatcher - Captures every request environment
// ============================================================================

/// Dispatcher that records environments instead of handling them
///
/// Optionally fails once a set number of dispatches has succeeded.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    received: Mutex<Vec<RequestEnvironment>>,
    fail_after: Option<usize>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed `successes` times, then fail every further dispatch
    pub fn failing_after(successes: usize) -> Self {
        Self {
            received: Mutex::new(Vec::new()),
            fail_after: Some(successes),
        }
    }

    /// All environments dispatched so far, in order
    pub fn received(&self) -> Vec<RequestEnvironment> {
        self.received.lock().clone()
    }

    /// Request URIs dispatched so far, in order
    pub fn uris(&self) -> Vec<String> {
        self.received
            .lock()
            .iter()
            .map(|env| env.request_uri.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.received.lock().len()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn dispatch(&self, env: &RequestEnvironment) -> Result<()> {
        let mut received = self.received.lock();
        if let Some(limit) = self.fail_after {
            if received.len() >= limit {
                return Err(BenchError::dispatch(format!(
                    "{} failed after {} requests",
                    env.request_uri, limit
                )));
            }
        }
        received.push(env.clone());
        Ok(())
    }
}

// ============================================================================
// RecordingReclaimer - Captures collection control calls
// ============================================================================

/// A call made on a [`MemoryReclaimController`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReclaimCall {
    Collect,
    Pause,
    Resume,
}

/// Reclaim controller that records calls and tracks the paused flag
#[derive(Debug, Default)]
pub struct RecordingReclaimer {
    calls: Mutex<Vec<ReclaimCall>>,
    paused: AtomicBool,
}

impl RecordingReclaimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ReclaimCall> {
        self.calls.lock().clone()
    }

    /// Number of forced collections
    pub fn collections(&self) -> usize {
        self.count(ReclaimCall::Collect)
    }

    pub fn resumes(&self) -> usize {
        self.count(ReclaimCall::Resume)
    }

    /// True while automatic collection is suspended
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    fn count(&self, kind: ReclaimCall) -> usize {
        self.calls.lock().iter().filter(|c| **c == kind).count()
    }
}

impl MemoryReclaimController for RecordingReclaimer {
    fn force_collect_now(&self) {
        self.calls.lock().push(ReclaimCall::Collect);
    }

    fn pause(&self) {
        self.calls.lock().push(ReclaimCall::Pause);
        self.paused.store(true, Ordering::Release);
    }

    fn resume(&self) {
        self.calls.lock().push(ReclaimCall::Resume);
        self.paused.store(false, Ordering::Release);
    }
}
