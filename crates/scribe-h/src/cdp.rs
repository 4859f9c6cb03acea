use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use scribe_engine::config::BrowserConfig as BrowserSettings;
use scribe_engine::error::BackendError;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;

const USER_DATA_DIR_ENV: &str = "SCRIBE_USER_DATA_DIR";

pub struct CdpClient {
    pub browser: Browser,
    pub handler_task: JoinHandle<()>,
    pub page: Page,
    user_data_dir: Option<PathBuf>,
    cleanup_user_data_dir: bool,
}

impl CdpClient {
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, BackendError> {
        let mut config_builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(settings.viewport_width, settings.viewport_height)
            .viewport(Viewport {
                width: settings.viewport_width,
                height: settings.viewport_height,
                ..Default::default()
            });
        let (user_data_dir, cleanup_user_data_dir) =
            resolve_user_data_dir(settings.user_data_dir.as_ref())?;
        config_builder = config_builder.user_data_dir(&user_data_dir);

        if settings.headless {
            tracing::info!("Launching browser in headless mode");
        } else {
            tracing::info!("Launching browser in visible mode");
            config_builder = config_builder.with_head();
        }

        // CHROME_BIN wins over the configured binary.
        let chrome_bin = std::env::var("CHROME_BIN")
            .ok()
            .map(PathBuf::from)
            .or_else(|| settings.chrome_bin.clone());
        if let Some(chrome_bin) = chrome_bin {
            tracing::info!("Using custom Chrome binary: {}", chrome_bin.display());
            config_builder = config_builder.chrome_executable(chrome_bin);
        }

        let config = config_builder
            .build()
            .map_err(|e| BackendError::Other(format!("Failed to build browser config: {}", e)))?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BackendError::Other(format!("Failed to launch browser: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if let Err(e) = h {
                    tracing::error!("Browser handler error (ignoring): {}", e);
                    continue;
                }
            }
            tracing::info!("Browser handler task ended");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BackendError::Other(format!("Failed to create page: {}", e)))?;

        if !settings.user_agent.is_empty() {
            page.execute(SetUserAgentOverrideParams::new(settings.user_agent.clone()))
                .await
                .map_err(|e| BackendError::Other(format!("Failed to set user agent: {}", e)))?;
        }

        let mut console_events = page
            .event_listener::<chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled>()
            .await
            .map_err(|e| {
                BackendError::Other(format!("Failed to subscribe to console events: {}", e))
            })?;

        tokio::spawn(async move {
            while let Some(event) = console_events.next().await {
                let args_str: Vec<String> = event
                    .args
                    .iter()
                    .map(|arg| {
                        arg.description
                            .clone()
                            .or_else(|| arg.value.as_ref().map(|v| v.to_string()))
                            .unwrap_or_else(|| "unknown".to_string())
                    })
                    .collect();
                tracing::debug!(
                    "Browser Console [{:?}]: {}",
                    event.r#type,
                    args_str.join(" ")
                );
            }
        });

        // Editors raise "leave this page?" prompts; accept them so nothing blocks.
        let mut dialog_events = page
            .event_listener::<chromiumoxide::cdp::browser_protocol::page::EventJavascriptDialogOpening>()
            .await
            .map_err(|e| {
                BackendError::Other(format!("Failed to subscribe to dialog events: {}", e))
            })?;

        let page_clone = page.clone();
        tokio::spawn(async move {
            while let Some(event) = dialog_events.next().await {
                tracing::info!(
                    "Handling JavaScript Dialog: {} ({:?})",
                    event.message,
                    event.r#type
                );
                let cmd =
                    chromiumoxide::cdp::browser_protocol::page::HandleJavaScriptDialogParams::new(
                        true,
                    );
                if let Err(e) = page_clone.execute(cmd).await {
                    tracing::error!("Failed to handle/accept dialog: {}", e);
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
            page,
            user_data_dir: Some(user_data_dir),
            cleanup_user_data_dir,
        })
    }

    pub async fn close(mut self) -> Result<(), BackendError> {
        let closed = self
            .browser
            .close()
            .await
            .map_err(|e| BackendError::Other(format!("Error closing browser: {}", e)));
        if let Err(e) = self.handler_task.await {
            tracing::debug!("Error awaiting handler: {}", e);
        }

        if self.cleanup_user_data_dir
            && let Some(dir) = &self.user_data_dir
            && let Err(e) = std::fs::remove_dir_all(dir)
        {
            tracing::debug!("Failed to clean up user-data-dir {}: {}", dir.display(), e);
        }

        closed.map(|_| ())
    }
}

/// A configured or env-provided profile directory is kept; otherwise an
/// isolated one is created and removed on close.
fn resolve_user_data_dir(configured: Option<&PathBuf>) -> Result<(PathBuf, bool), BackendError> {
    let persistent = std::env::var(USER_DATA_DIR_ENV)
        .ok()
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .or_else(|| configured.cloned());
    if let Some(path) = persistent {
        std::fs::create_dir_all(&path)?;
        tracing::info!("Using user data dir: {}", path.display());
        return Ok((path, false));
    }

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| BackendError::Other(format!("System clock error: {}", e)))?
        .as_nanos();
    let unique = format!("scribe-chromium-profile-{}-{}", std::process::id(), nanos);
    let path = std::env::temp_dir().join(unique);
    std::fs::create_dir_all(&path)?;
    tracing::info!("Using isolated user data dir: {}", path.display());
    Ok((path, true))
}
