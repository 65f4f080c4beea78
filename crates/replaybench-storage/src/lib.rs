// Postgres storage layer with sqlx
//
// This crate provides database implementations for core traits:
// - PgSessionStore: implements SessionStore for benchmark sessions
// - PgStaleSessionCleanup: implements StaleSessionCleanup by purging rows created during a run

pub mod models;
pub mod repositories;
pub mod session_store;

pub use models::*;
pub use repositories::{Database, DEFAULT_SESSION_TABLE};
pub use session_store::{connect, PgSessionStore, PgStaleSessionCleanup};
