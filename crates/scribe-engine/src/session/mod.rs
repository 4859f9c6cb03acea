//! Session Store
//!
//! Persists the browser's authentication state between runs. The store is read
//! once at the start of a publish run and written at most once, after a fresh
//! login.
//!
//! Concurrent runs sharing one store are not coordinated: the last writer wins
//! and a run may restore a session another run is about to replace.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scribe_common::protocol::Cookie;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session data is not valid: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Persisted authentication state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub cookies: Vec<Cookie>,
    pub captured_at: DateTime<Utc>,
}

impl Session {
    pub fn new(cookies: Vec<Cookie>) -> Self {
        Self {
            cookies,
            captured_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The stored session, or `None` when nothing has been captured yet.
    /// Presence says nothing about validity.
    async fn load(&self) -> Result<Option<Session>, SessionError>;

    async fn save(&self, session: &Session) -> Result<(), SessionError>;
}
