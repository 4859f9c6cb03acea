use async_trait::async_trait;
pub use scribe_common::error::BackendError;
pub use scribe_common::protocol::NavigationResult;
use scribe_common::intent::definition::LookupStrategy;
use scribe_common::protocol::{Cookie, ElementHandle};
use std::path::Path;
use std::time::Duration;

/// The browser driver the publisher talks to.
///
/// One backend owns one page. Callers never issue concurrent calls against it;
/// every method takes `&mut self` for that reason.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Launch the backend (start browser, open the page).
    async fn launch(&mut self) -> Result<(), BackendError>;

    /// Close the backend and cleanup resources. Must be safe to call when the
    /// backend never launched or is already closed.
    async fn close(&mut self) -> Result<(), BackendError>;

    /// Navigate to a URL and wait for the document to load.
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError>;

    /// Location of the page right now (after any client-side redirect).
    async fn current_url(&mut self) -> Result<String, BackendError>;

    /// Reload the current page.
    async fn refresh(&mut self) -> Result<NavigationResult, BackendError>;

    /// Evaluate a single lookup strategy. Returns `None` when nothing visible
    /// matches. Must be bounded and free of side effects on the page content.
    async fn query(
        &mut self,
        strategy: &LookupStrategy,
    ) -> Result<Option<ElementHandle>, BackendError>;

    async fn click(&mut self, element: &ElementHandle) -> Result<(), BackendError>;

    /// Type text with key events (short inputs such as titles and credentials).
    async fn type_text(&mut self, element: &ElementHandle, text: &str) -> Result<(), BackendError>;

    /// Insert text as a single unit into an editable element, independent of
    /// its length.
    async fn insert_text(
        &mut self,
        element: &ElementHandle,
        text: &str,
    ) -> Result<(), BackendError>;

    /// Click `element` expecting a native file-selection surface. If one opens
    /// within `wait` it is satisfied with `file` and `true` is returned;
    /// `false` means no surface appeared.
    async fn click_for_file_chooser(
        &mut self,
        element: &ElementHandle,
        file: &Path,
        wait: Duration,
    ) -> Result<bool, BackendError>;

    /// Serialized markup of the current page.
    async fn page_content(&mut self) -> Result<String, BackendError>;

    /// Capture a screenshot of the current viewport (PNG bytes).
    async fn screenshot(&mut self) -> Result<Vec<u8>, BackendError>;

    /// Get all cookies from the current session.
    async fn get_cookies(&mut self) -> Result<Vec<Cookie>, BackendError> {
        Err(BackendError::NotSupported("get_cookies".into()))
    }

    /// Install cookies before the first navigation.
    async fn set_cookies(&mut self, _cookies: &[Cookie]) -> Result<(), BackendError> {
        Err(BackendError::NotSupported("set_cookies".into()))
    }
}
