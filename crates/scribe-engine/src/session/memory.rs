use super::{Session, SessionError, SessionStore};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// In-process store, used by tests and one-off runs that must not touch disk.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    session: Option<Session>,
    saves: usize,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.inner.lock() {
            state.session = Some(session);
        }
        store
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.lock().ok().and_then(|s| s.session.clone())
    }

    /// Number of times `save` was called.
    pub fn save_count(&self) -> usize {
        self.inner.lock().map(|s| s.saves).unwrap_or(0)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<Session>, SessionError> {
        Ok(self.current())
    }

    async fn save(&self, session: &Session) -> Result<(), SessionError> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| std::io::Error::other("session store lock poisoned"))?;
        state.session = Some(session.clone());
        state.saves += 1;
        Ok(())
    }
}
