use crate::resolution::ResolutionError;
use crate::session::SessionError;
use scribe_common::error::BackendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Invalid publish request: {0}")]
    InvalidRequest(String),

    /// The editor redirected to its login surface and the run cannot log in.
    #[error("Session invalid: {0}")]
    SessionInvalid(String),

    /// Credentials rejected or a manual challenge was not solved in time.
    /// Never retried automatically.
    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("Intent not found: {0}")]
    IntentNotFound(#[from] ResolutionError),

    /// The content may exist as a draft but was not published.
    #[error("Publish not confirmed: {0}")]
    PublishNotConfirmed(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Browser error: {0}")]
    Backend(#[from] BackendError),

    #[error("Session store error: {0}")]
    Session(#[from] SessionError),

    /// The run stopped on an unexpected fault (panic inside a step).
    #[error("Run aborted: {0}")]
    Aborted(String),
}
