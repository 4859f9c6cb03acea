use super::diagnostics::{DiagnosticBundle, DiagnosticsWriter};
use super::error::PublishError;
use super::request::{PublishOutcome, PublishRequest, PublishStatus};
use super::state::{FailurePolicy, PublishState, RunFacts};
use crate::backend::Backend;
use crate::resolution::IntentCatalog;
use crate::session::SessionStore;
use futures::FutureExt;
use scribe_common::config::{CredentialsConfig, EditorConfig, ScribeConfig, TimeoutConfig};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use tracing::{error, info, warn};

/// Login credentials. Never logged.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Read from the configured environment variables; `None` unless both are
    /// set and non-empty.
    pub fn from_env(config: &CredentialsConfig) -> Option<Self> {
        let email = std::env::var(&config.email_env).ok()?;
        let password = std::env::var(&config.password_env).ok()?;
        if email.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self::new(email, password))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PublisherSettings {
    pub editor: EditorConfig,
    pub timeouts: TimeoutConfig,
    pub credentials: Option<Credentials>,
    /// A visible browser gets the longer manual login window.
    pub headless: bool,
}

impl PublisherSettings {
    pub fn from_config(config: &ScribeConfig, credentials: Option<Credentials>) -> Self {
        Self {
            editor: config.editor.clone(),
            timeouts: config.timeouts.clone(),
            credentials,
            headless: config.browser.headless,
        }
    }

    pub(crate) fn is_login_location(&self, url: &str) -> bool {
        classify_location(url, &self.editor.login_markers) == SessionCheck::RedirectedToLogin
    }

    pub(crate) fn is_editor_location(&self, url: &str) -> bool {
        !self.is_login_location(url) && self.editor.editor_markers.iter().any(|m| url.contains(m))
    }
}

/// Classification of the location reached from the editor entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCheck {
    Valid,
    RedirectedToLogin,
}

/// A redirect to a login surface is the only signal of an invalid session.
pub fn classify_location(url: &str, login_markers: &[String]) -> SessionCheck {
    if login_markers.iter().any(|m| url.contains(m.as_str())) {
        SessionCheck::RedirectedToLogin
    } else {
        SessionCheck::Valid
    }
}

/// Mutable bookkeeping of one run.
pub(crate) struct RunContext<'r> {
    pub request: &'r PublishRequest,
    pub facts: RunFacts,
    pub warnings: Vec<String>,
    pub visited: Vec<PublishState>,
    pub diagnostics: Option<DiagnosticBundle>,
}

impl<'r> RunContext<'r> {
    fn new(request: &'r PublishRequest) -> Self {
        Self {
            request,
            facts: RunFacts {
                has_header_image: request.header_image.is_some(),
                has_body_image: request.body_image.is_some(),
                ..Default::default()
            },
            warnings: Vec::new(),
            visited: Vec::new(),
            diagnostics: None,
        }
    }

    pub fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Runs the publish state machine against one backend.
///
/// The backend is launched at the start of a run and closed on every exit
/// path, including a panic inside a step.
pub struct Publisher<'a, B: Backend + ?Sized> {
    pub(crate) backend: &'a mut B,
    pub(crate) store: &'a dyn SessionStore,
    pub(crate) catalog: IntentCatalog,
    pub(crate) settings: PublisherSettings,
    pub(crate) diagnostics: DiagnosticsWriter,
}

impl<'a, B: Backend + ?Sized> Publisher<'a, B> {
    pub fn new(backend: &'a mut B, store: &'a dyn SessionStore, settings: PublisherSettings) -> Self {
        Self {
            backend,
            store,
            catalog: IntentCatalog::builtin(),
            settings,
            diagnostics: DiagnosticsWriter::new(".", "note", true),
        }
    }

    pub fn with_catalog(mut self, catalog: IntentCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: DiagnosticsWriter) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Execute one publish run. Produces exactly one outcome.
    pub async fn run(&mut self, request: &PublishRequest) -> PublishOutcome {
        let mut run = RunContext::new(request);
        let result = AssertUnwindSafe(self.drive(&mut run)).catch_unwind().await;
        self.release().await;

        let status = match result {
            Ok(Ok(())) => {
                info!("Publish run finished: published");
                PublishStatus::Published
            }
            Ok(Err(e)) => {
                error!("Publish run failed: {}", e);
                PublishStatus::Failed(e)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Publish run aborted by a fault: {}", message);
                PublishStatus::Failed(PublishError::Aborted(message))
            }
        };

        PublishOutcome {
            status,
            diagnostics: run.diagnostics,
            warnings: run.warnings,
            visited: run.visited,
            header_image_verified: run.facts.header_image_verified,
            body_image_verified: run.facts.body_image_verified,
        }
    }

    /// Restore the stored session, verify it and log in if needed, then
    /// close the browser. Returns the classification seen before any login.
    pub async fn refresh_session(&mut self) -> Result<SessionCheck, PublishError> {
        let request = PublishRequest::new("-", "-");
        let mut run = RunContext::new(&request);
        let result = AssertUnwindSafe(self.drive_session(&mut run))
            .catch_unwind()
            .await;
        self.release().await;
        match result {
            Ok(r) => r,
            Err(panic) => Err(PublishError::Aborted(panic_message(panic.as_ref()))),
        }
    }

    async fn drive_session(&mut self, run: &mut RunContext<'_>) -> Result<SessionCheck, PublishError> {
        for state in [PublishState::AcquireSession, PublishState::VerifyLoggedIn] {
            run.visited.push(state);
            self.step(state, run).await?;
        }
        let check = if run.facts.logged_in {
            SessionCheck::Valid
        } else {
            SessionCheck::RedirectedToLogin
        };
        if check == SessionCheck::RedirectedToLogin {
            run.visited.push(PublishState::LoginFlow);
            self.step(PublishState::LoginFlow, run).await?;
        }
        Ok(check)
    }

    async fn drive(&mut self, run: &mut RunContext<'_>) -> Result<(), PublishError> {
        run.request.validate()?;

        let mut state = PublishState::AcquireSession;
        loop {
            run.visited.push(state);
            if state == PublishState::Done {
                break;
            }
            info!(state = %state, "Entering state");

            if let Err(err) = self.execute(state, run).await {
                match state.policy() {
                    FailurePolicy::Continue => {
                        run.warn(format!("{} degraded: {}", state, err));
                    }
                    FailurePolicy::Abort => {
                        error!(state = %state, "State failed: {}", err);
                        let bundle = self
                            .diagnostics
                            .capture(&mut *self.backend, state.diagnostic_stage())
                            .await;
                        if !bundle.is_empty() {
                            run.diagnostics = Some(bundle);
                        }
                        return Err(err);
                    }
                }
            }

            state = state.next(&run.facts);
        }

        if !run.facts.confirm_clicked {
            return Err(PublishError::PublishNotConfirmed(
                "no confirmation control was invoked".into(),
            ));
        }
        Ok(())
    }

    /// Run one state and abort on failure with diagnostics, used by the
    /// session-only flow.
    async fn step(&mut self, state: PublishState, run: &mut RunContext<'_>) -> Result<(), PublishError> {
        if let Err(err) = self.execute(state, run).await {
            let bundle = self
                .diagnostics
                .capture(&mut *self.backend, state.diagnostic_stage())
                .await;
            if !bundle.is_empty() {
                run.diagnostics = Some(bundle);
            }
            return Err(err);
        }
        Ok(())
    }

    async fn release(&mut self) {
        if let Err(e) = self.backend.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
