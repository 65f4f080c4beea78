// Synthetic benchmark session
//
// One session is created per run, before the first dispatch, and deleted after
// the last. Requests that do not ask for a new session carry its identifier in
// their cookie.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::Result;
use crate::traits::{NoopCleanup, SessionStore, StaleSessionCleanup};

/// Initial key/value pairs written into the session
pub type SessionData = BTreeMap<String, serde_json::Value>;

/// The live session of a run
///
/// Not `Clone`: the handle is consumed by [`SessionManager::delete_session`],
/// so nothing can build a request environment from a deleted session.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionHandle {
    session_id: String,
    data: SessionData,
    is_new: bool,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    /// True when the store issued a fresh identifier for this run
    pub fn is_new(&self) -> bool {
        self.is_new
    }
}

/// Creates and tears down the run's session
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    cleanup: Arc<dyn StaleSessionCleanup>,
}

impl SessionManager {
    /// Manager with the no-op stale session cleanup
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            cleanup: Arc::new(NoopCleanup),
        }
    }

    /// Replace the stale session cleanup strategy
    pub fn with_cleanup(mut self, cleanup: Arc<dyn StaleSessionCleanup>) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Start a new session populated with `initial_data`
    pub async fn create_session(&self, initial_data: &SessionData) -> Result<SessionHandle> {
        let session_id = self.store.create_session(initial_data).await?;
        tracing::debug!(session_id = %session_id, keys = initial_data.len(), "Created benchmark session");

        Ok(SessionHandle {
            session_id,
            data: initial_data.clone(),
            is_new: true,
        })
    }

    /// Delete the session, invalidating its identifier
    pub async fn delete_session(&self, handle: SessionHandle) -> Result<()> {
        self.store.delete_session(&handle.session_id).await?;
        tracing::debug!(session_id = %handle.session_id, "Deleted benchmark session");
        Ok(())
    }

    /// Run the configured stale session cleanup
    pub async fn delete_stale_sessions(&self) -> Result<u64> {
        let removed = self.cleanup.delete_stale_sessions().await?;
        if removed > 0 {
            tracing::debug!(removed, "Purged stale sessions");
        }
        Ok(removed)
    }
}
