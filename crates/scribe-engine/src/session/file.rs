use super::{Session, SessionError, SessionStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scribe_common::config::SessionConfig;
use scribe_common::protocol::Cookie;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// JSON file store.
///
/// Accepts both the native `{cookies, captured_at}` document and a bare cookie
/// array as exported by browser tooling.
pub struct FileSessionStore {
    path: PathBuf,
    seed: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredSession {
    Native(Session),
    CookieArray(Vec<Cookie>),
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seed: None,
        }
    }

    /// Content written to the file on first load when the file is missing.
    pub fn with_seed(mut self, seed: Option<String>) -> Self {
        self.seed = seed.filter(|s| !s.trim().is_empty());
        self
    }

    /// Store at the configured path, seeded from the configured environment
    /// variable when it is set.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(&config.path).with_seed(std::env::var(&config.seed_env).ok())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn captured_at(&self) -> DateTime<Utc> {
        tokio::fs::metadata(&self.path)
            .await
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now())
    }

    /// Read the stored session, falling back to the seed, without writing
    /// anything to disk.
    pub async fn peek(&self) -> Result<Option<Session>, SessionError> {
        if self.path.exists() {
            let content = tokio::fs::read_to_string(&self.path).await?;
            return self.parse(&content).await.map(Some);
        }
        match &self.seed {
            Some(seed) => self.parse(seed).await.map(Some),
            None => Ok(None),
        }
    }

    async fn parse(&self, content: &str) -> Result<Session, SessionError> {
        Ok(match serde_json::from_str::<StoredSession>(content)? {
            StoredSession::Native(session) => session,
            StoredSession::CookieArray(cookies) => Session {
                cookies,
                captured_at: self.captured_at().await,
            },
        })
    }

    async fn write_atomic(&self, content: &str) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<Session>, SessionError> {
        if !self.path.exists() {
            match &self.seed {
                Some(seed) => {
                    info!("Seeding session file {} from environment", self.path.display());
                    // Validate before persisting so a bad seed never lands on disk.
                    serde_json::from_str::<StoredSession>(seed)?;
                    self.write_atomic(seed).await?;
                }
                None => {
                    debug!("No session file at {}", self.path.display());
                    return Ok(None);
                }
            }
        }

        let content = tokio::fs::read_to_string(&self.path).await?;
        let session = self.parse(&content).await?;
        debug!(
            "Loaded {} cookies captured at {}",
            session.cookies.len(),
            session.captured_at
        );
        Ok(Some(session))
    }

    async fn save(&self, session: &Session) -> Result<(), SessionError> {
        let content = serde_json::to_string_pretty(session)?;
        self.write_atomic(&content).await?;
        info!(
            "Saved {} cookies to {}",
            session.cookies.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const SEED: &str = r#"[{"name":"_note_session_v5","value":"seeded"}]"#;

    fn config(path: &Path, seed_env: &str) -> SessionConfig {
        SessionConfig {
            path: path.to_path_buf(),
            seed_env: seed_env.to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_without_seed_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("cookies.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("cookies.json"));
        let session = Session::new(vec![
            Cookie::new("b", "2").with_domain(".note.com"),
            Cookie::new("a", "1"),
        ]);
        store.save(&session).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, session);
        assert_eq!(loaded.cookies[0].name, "b");
    }

    #[tokio::test]
    async fn test_legacy_cookie_array_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        tokio::fs::write(
            &path,
            r#"[{"name":"_note_session","value":"abc","domain":".note.com","path":"/","expires":1900000000.5,"size":20,"httpOnly":true,"secure":true,"session":false}]"#,
        )
        .await
        .unwrap();

        let session = FileSessionStore::new(&path).load().await.unwrap().unwrap();
        assert_eq!(session.cookies.len(), 1);
        assert_eq!(session.cookies[0].http_only, Some(true));
        assert_eq!(session.cookies[0].domain.as_deref(), Some(".note.com"));
    }

    #[tokio::test]
    async fn test_seed_is_written_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        let store = FileSessionStore::new(&path)
            .with_seed(Some(r#"[{"name":"s","value":"v"}]"#.to_string()));

        let session = store.load().await.unwrap().unwrap();
        assert_eq!(session.cookies[0].name, "s");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_invalid_seed_is_rejected_and_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        let store = FileSessionStore::new(&path).with_seed(Some("not json".to_string()));

        assert!(matches!(
            store.load().await.unwrap_err(),
            SessionError::Malformed(_)
        ));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_blank_seed_counts_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store =
            FileSessionStore::new(dir.path().join("cookies.json")).with_seed(Some("  ".into()));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_peek_reads_seed_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        let store = FileSessionStore::new(&path).with_seed(Some(SEED.to_string()));

        let session = store.peek().await.unwrap().unwrap();
        assert_eq!(session.cookies[0].value, "seeded");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_peek_prefers_file_over_seed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        FileSessionStore::new(&path)
            .save(&Session::new(vec![Cookie::new("_note_session_v5", "on_disk")]))
            .await
            .unwrap();

        let store = FileSessionStore::new(&path).with_seed(Some(SEED.to_string()));
        let session = store.peek().await.unwrap().unwrap();
        assert_eq!(session.cookies[0].value, "on_disk");
    }

    #[tokio::test]
    #[serial]
    async fn test_from_config_seeds_from_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");

        // SAFETY: serialized with other env-mutating tests.
        unsafe { std::env::set_var("SCRIBE_TEST_SESSION_SEED", SEED) };
        let store = FileSessionStore::from_config(&config(&path, "SCRIBE_TEST_SESSION_SEED"));
        unsafe { std::env::remove_var("SCRIBE_TEST_SESSION_SEED") };

        let session = store.load().await.unwrap().unwrap();
        assert_eq!(session.cookies[0].value, "seeded");
        assert!(path.exists());
    }

    #[tokio::test]
    #[serial]
    async fn test_from_config_without_seed_variable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");

        unsafe { std::env::remove_var("SCRIBE_TEST_SESSION_SEED") };
        let unset = FileSessionStore::from_config(&config(&path, "SCRIBE_TEST_SESSION_SEED"));
        assert!(unset.load().await.unwrap().is_none());

        unsafe { std::env::set_var("SCRIBE_TEST_SESSION_SEED", "") };
        let empty = FileSessionStore::from_config(&config(&path, "SCRIBE_TEST_SESSION_SEED"));
        unsafe { std::env::remove_var("SCRIBE_TEST_SESSION_SEED") };
        assert!(empty.load().await.unwrap().is_none());
        assert!(!path.exists());
    }
}
