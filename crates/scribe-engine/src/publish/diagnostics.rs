use crate::backend::Backend;
use scribe_common::config::DiagnosticsConfig;
use std::path::PathBuf;
use tracing::{error, warn};

/// Files written when a run aborts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticBundle {
    pub url: Option<String>,
    pub snapshot: Option<PathBuf>,
    pub screenshot: Option<PathBuf>,
}

impl DiagnosticBundle {
    pub fn is_empty(&self) -> bool {
        self.snapshot.is_none() && self.screenshot.is_none()
    }
}

/// Writes page snapshots to well-known names: `{prefix}_{stage}_error.html`
/// and `{prefix}_{stage}_error.png`. A later failure at the same stage
/// overwrites the previous artifacts.
#[derive(Debug, Clone)]
pub struct DiagnosticsWriter {
    dir: PathBuf,
    prefix: String,
    screenshot: bool,
}

impl DiagnosticsWriter {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>, screenshot: bool) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            screenshot,
        }
    }

    pub fn from_config(config: &DiagnosticsConfig) -> Self {
        Self::new(&config.dir, &config.prefix, config.screenshot)
    }

    pub fn snapshot_path(&self, stage: &str) -> PathBuf {
        self.dir.join(format!("{}_{}_error.html", self.prefix, stage))
    }

    pub fn screenshot_path(&self, stage: &str) -> PathBuf {
        self.dir.join(format!("{}_{}_error.png", self.prefix, stage))
    }

    /// Best effort: every artifact that can be captured is written; failures
    /// are logged and leave the corresponding field empty.
    pub async fn capture<B: Backend + ?Sized>(&self, backend: &mut B, stage: &str) -> DiagnosticBundle {
        let mut bundle = DiagnosticBundle {
            url: backend.current_url().await.ok(),
            ..Default::default()
        };

        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            error!("Cannot create diagnostics dir {}: {}", self.dir.display(), e);
            return bundle;
        }

        match backend.page_content().await {
            Ok(html) => {
                let path = self.snapshot_path(stage);
                match tokio::fs::write(&path, html).await {
                    Ok(()) => {
                        error!("Page snapshot written to {}", path.display());
                        bundle.snapshot = Some(path);
                    }
                    Err(e) => warn!("Failed to write {}: {}", path.display(), e),
                }
            }
            Err(e) => warn!("Could not read page content for diagnostics: {}", e),
        }

        if self.screenshot {
            match backend.screenshot().await {
                Ok(bytes) => {
                    let path = self.screenshot_path(stage);
                    match tokio::fs::write(&path, bytes).await {
                        Ok(()) => bundle.screenshot = Some(path),
                        Err(e) => warn!("Failed to write {}: {}", path.display(), e),
                    }
                }
                Err(e) => warn!("Could not capture screenshot for diagnostics: {}", e),
            }
        }

        bundle
    }
}
