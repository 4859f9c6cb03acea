use crate::cdp::CdpClient;
use crate::inject::{evaluate, retry_on_context_error};
use crate::lookup::{LookupResult, marker_selector, lookup_script};
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, SetCookiesParams, TimeSinceEpoch};
use chromiumoxide::cdp::browser_protocol::page::{
    EventFileChooserOpened, SetInterceptFileChooserDialogParams,
};
use chromiumoxide::element::Element;
use futures::StreamExt;
use scribe_engine::backend::{Backend, BackendError, NavigationResult};
use scribe_engine::config::BrowserConfig as BrowserSettings;
use scribe_engine::intent::definition::LookupStrategy;
use scribe_engine::protocol::{Cookie, ElementHandle};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Chromium driven over CDP.
pub struct HeadlessBackend {
    client: Option<CdpClient>,
    settings: BrowserSettings,
}

impl HeadlessBackend {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            client: None,
            settings,
        }
    }

    pub fn get_client(&self) -> Option<&CdpClient> {
        self.client.as_ref()
    }

    fn page(&self) -> Result<&Page, BackendError> {
        self.client
            .as_ref()
            .map(|c| &c.page)
            .ok_or(BackendError::NotReady)
    }

    async fn get_navigation_result(page: &Page) -> Result<NavigationResult, BackendError> {
        let title = page
            .get_title()
            .await
            .unwrap_or_default()
            .unwrap_or_default();
        let url = page
            .url()
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?
            .unwrap_or_default();
        Ok(NavigationResult { url, title })
    }

    /// The live element a lookup tagged earlier.
    async fn element(page: &Page, handle: &ElementHandle) -> Result<Element, BackendError> {
        let selector = marker_selector(handle.id);
        retry_on_context_error("Element lookup", || page.find_element(selector.as_str()))
            .await
            .map_err(|e| {
                BackendError::Interaction(format!(
                    "element {} ({}) is gone: {}",
                    handle.id, handle.matched_by, e
                ))
            })
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new(BrowserSettings::default())
    }
}

fn to_cookie_param(cookie: &Cookie) -> Result<CookieParam, BackendError> {
    let mut builder = CookieParam::builder()
        .name(cookie.name.clone())
        .value(cookie.value.clone());
    if let Some(domain) = &cookie.domain {
        builder = builder.domain(domain.clone());
    }
    if let Some(path) = &cookie.path {
        builder = builder.path(path.clone());
    }
    // Session cookies are exported with a non-positive expiry.
    if let Some(expires) = cookie.expires.filter(|e| *e > 0.0) {
        builder = builder.expires(TimeSinceEpoch::new(expires));
    }
    if let Some(http_only) = cookie.http_only {
        builder = builder.http_only(http_only);
    }
    if let Some(secure) = cookie.secure {
        builder = builder.secure(secure);
    }
    builder
        .build()
        .map_err(|e| BackendError::Other(format!("Invalid cookie {}: {}", cookie.name, e)))
}

#[async_trait]
impl Backend for HeadlessBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        info!("Launching Headless Backend (Chromium)...");
        let client = CdpClient::launch(&self.settings).await?;
        self.client = Some(client);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        if let Some(client) = self.client.take() {
            client.close().await?;
        }
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError> {
        let page = self.page()?;
        info!("Navigating to: {}", url);
        page.goto(url)
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?;
        Self::get_navigation_result(page).await
    }

    async fn current_url(&mut self) -> Result<String, BackendError> {
        let page = self.page()?;
        Ok(page
            .url()
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?
            .unwrap_or_default())
    }

    async fn refresh(&mut self) -> Result<NavigationResult, BackendError> {
        let page = self.page()?;
        page.reload()
            .await
            .map_err(|e| BackendError::Navigation(format!("refresh failed: {}", e)))?;
        Self::get_navigation_result(page).await
    }

    async fn query(
        &mut self,
        strategy: &LookupStrategy,
    ) -> Result<Option<ElementHandle>, BackendError> {
        let page = self.page()?;
        let script = lookup_script(strategy)?;
        let value = evaluate(page, &script).await?;
        let result: LookupResult = serde_json::from_value(value)?;
        let found = result.into_match()?;
        debug!(strategy = %strategy, ?found, "LookupQuery");
        Ok(found.map(|id| ElementHandle {
            id,
            matched_by: strategy.to_string(),
        }))
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), BackendError> {
        let page = self.page()?;
        Self::element(page, element)
            .await?
            .click()
            .await
            .map_err(|e| BackendError::Interaction(format!("click failed: {}", e)))?;
        Ok(())
    }

    async fn type_text(&mut self, element: &ElementHandle, text: &str) -> Result<(), BackendError> {
        let page = self.page()?;
        let target = Self::element(page, element).await?;
        target
            .click()
            .await
            .map_err(|e| BackendError::Interaction(format!("focus failed: {}", e)))?;
        target
            .type_str(text)
            .await
            .map_err(|e| BackendError::Interaction(format!("typing failed: {}", e)))?;
        Ok(())
    }

    async fn insert_text(
        &mut self,
        element: &ElementHandle,
        text: &str,
    ) -> Result<(), BackendError> {
        let page = self.page()?;
        Self::element(page, element)
            .await?
            .focus()
            .await
            .map_err(|e| BackendError::Interaction(format!("focus failed: {}", e)))?;
        page.execute(InsertTextParams::new(text))
            .await
            .map_err(|e| BackendError::Interaction(format!("insert text failed: {}", e)))?;
        debug!(chars = text.chars().count(), "Inserted text");
        Ok(())
    }

    async fn click_for_file_chooser(
        &mut self,
        element: &ElementHandle,
        file: &Path,
        wait: Duration,
    ) -> Result<bool, BackendError> {
        let page = self.page()?;
        let target = Self::element(page, element).await?;

        page.execute(SetInterceptFileChooserDialogParams::new(true))
            .await
            .map_err(|e| BackendError::Other(format!("file chooser interception failed: {}", e)))?;
        let mut choosers = page
            .event_listener::<EventFileChooserOpened>()
            .await
            .map_err(|e| BackendError::Other(format!("Failed to subscribe to file chooser: {}", e)))?;

        let outcome = async {
            target
                .click()
                .await
                .map_err(|e| BackendError::Interaction(format!("click failed: {}", e)))?;
            let Ok(Some(event)) = tokio::time::timeout(wait, choosers.next()).await else {
                debug!(element = element.id, "No file chooser opened");
                return Ok(false);
            };
            let Some(node) = event.backend_node_id else {
                warn!("File chooser opened without a target input");
                return Ok(false);
            };
            let params = SetFileInputFilesParams::builder()
                .files(vec![file.display().to_string()])
                .backend_node_id(node)
                .build()
                .map_err(BackendError::Other)?;
            page.execute(params)
                .await
                .map_err(|e| BackendError::Interaction(format!("set files failed: {}", e)))?;
            info!(file = %file.display(), "Supplied file to chooser");
            Ok(true)
        }
        .await;

        if let Err(e) = page
            .execute(SetInterceptFileChooserDialogParams::new(false))
            .await
        {
            debug!("Failed to disable file chooser interception: {}", e);
        }
        outcome
    }

    async fn page_content(&mut self) -> Result<String, BackendError> {
        let page = self.page()?;
        page.content()
            .await
            .map_err(|e| BackendError::Other(format!("Page content failed: {}", e)))
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, BackendError> {
        let page = self.page()?;
        let bytes = page
            .screenshot(chromiumoxide::page::ScreenshotParams::builder().build())
            .await
            .map_err(|e| BackendError::Other(format!("Screenshot failed: {}", e)))?;
        Ok(bytes)
    }

    async fn get_cookies(&mut self) -> Result<Vec<Cookie>, BackendError> {
        let page = self.page()?;
        let cookies = page
            .get_cookies()
            .await
            .map_err(|e| BackendError::Other(format!("Get cookies failed: {}", e)))?;

        Ok(cookies
            .into_iter()
            .map(|c| Cookie {
                name: c.name,
                value: c.value,
                domain: Some(c.domain),
                path: Some(c.path),
                expires: Some(c.expires),
                http_only: Some(c.http_only),
                secure: Some(c.secure),
            })
            .collect())
    }

    async fn set_cookies(&mut self, cookies: &[Cookie]) -> Result<(), BackendError> {
        let page = self.page()?;
        let params = cookies
            .iter()
            .map(to_cookie_param)
            .collect::<Result<Vec<_>, _>>()?;
        page.execute(SetCookiesParams::new(params))
            .await
            .map_err(|e| BackendError::Other(format!("Set cookies failed: {}", e)))?;
        info!(count = cookies.len(), "Installed cookies");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_param_drops_session_expiry() {
        let mut cookie = Cookie::new("_note_session_v5", "abc").with_domain(".note.com");
        cookie.expires = Some(-1.0);
        cookie.secure = Some(true);
        let param = to_cookie_param(&cookie).unwrap();
        assert_eq!(param.name, "_note_session_v5");
        assert_eq!(param.domain.as_deref(), Some(".note.com"));
        assert!(param.expires.is_none());
        assert_eq!(param.secure, Some(true));
    }

    #[tokio::test]
    async fn test_calls_before_launch_are_not_ready() {
        let mut backend = HeadlessBackend::default();
        assert!(matches!(
            backend.navigate("about:blank").await,
            Err(BackendError::NotReady)
        ));
        assert!(backend.close().await.is_ok());
    }
}
