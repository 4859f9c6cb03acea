use thiserror::Error;

/// Errors raised by a browser driver while talking to the page.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend not ready (launch it first)")]
    NotReady,

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Element interaction failed: {0}")]
    Interaction(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Not supported by this backend: {0}")]
    NotSupported(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backend error: {0}")]
    Other(String),
}
