use super::diagnostics::DiagnosticBundle;
use super::error::PublishError;
use super::state::PublishState;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Content for one publish run. Image paths must point at existing local
/// files; fetching remote assets happens before the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_image: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_image: Option<PathBuf>,
}

impl PublishRequest {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            header_image: None,
            body_image: None,
        }
    }

    pub fn with_header_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.header_image = Some(path.into());
        self
    }

    pub fn with_body_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.body_image = Some(path.into());
        self
    }

    pub fn validate(&self) -> Result<(), PublishError> {
        if self.title.trim().is_empty() {
            return Err(PublishError::InvalidRequest("title is empty".into()));
        }
        if self.body.trim().is_empty() {
            return Err(PublishError::InvalidRequest("body is empty".into()));
        }
        for (label, path) in [
            ("header image", &self.header_image),
            ("body image", &self.body_image),
        ] {
            if let Some(path) = path {
                check_file(label, path)?;
            }
        }
        Ok(())
    }
}

fn check_file(label: &str, path: &Path) -> Result<(), PublishError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PublishError::InvalidRequest(format!(
            "{} {} is not a readable file",
            label,
            path.display()
        )))
    }
}

#[derive(Debug)]
pub enum PublishStatus {
    Published,
    Failed(PublishError),
}

/// Result of exactly one publish run.
#[derive(Debug)]
pub struct PublishOutcome {
    pub status: PublishStatus,
    /// Artifacts captured when the run aborted.
    pub diagnostics: Option<DiagnosticBundle>,
    /// Non-fatal problems (degraded output such as an unverified image).
    pub warnings: Vec<String>,
    /// States entered, in order.
    pub visited: Vec<PublishState>,
    /// Whether the attached images were seen in the editor afterwards.
    pub header_image_verified: bool,
    pub body_image_verified: bool,
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self.status, PublishStatus::Published)
    }

    pub fn error(&self) -> Option<&PublishError> {
        match &self.status {
            PublishStatus::Published => None,
            PublishStatus::Failed(e) => Some(e),
        }
    }

    pub fn visited(&self, state: PublishState) -> bool {
        self.visited.contains(&state)
    }

    pub fn into_result(self) -> Result<Vec<String>, PublishError> {
        match self.status {
            PublishStatus::Published => Ok(self.warnings),
            PublishStatus::Failed(e) => Err(e),
        }
    }
}
