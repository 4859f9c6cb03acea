//! Per-state handlers of the publish machine.
//!
//! Every UI interaction goes through the action resolver; handlers only decide
//! how long to look and what a miss means for their own state.

use super::error::PublishError;
use super::machine::{Publisher, RunContext, SessionCheck, classify_location};
use super::state::PublishState;
use crate::backend::Backend;
use crate::resolution::{ActionResolver, EditorIntent};
use crate::session::Session;
use scribe_common::protocol::ElementHandle;
use std::path::Path;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
enum ImageSlot {
    Header,
    Body,
}

impl ImageSlot {
    fn trigger(self) -> EditorIntent {
        match self {
            ImageSlot::Header => EditorIntent::HeaderImageTrigger,
            ImageSlot::Body => EditorIntent::BodyImageTrigger,
        }
    }

    fn image(self) -> EditorIntent {
        match self {
            ImageSlot::Header => EditorIntent::HeaderImage,
            ImageSlot::Body => EditorIntent::BodyImage,
        }
    }

    fn placeholder(self) -> Option<EditorIntent> {
        match self {
            ImageSlot::Header => Some(EditorIntent::HeaderImagePlaceholder),
            ImageSlot::Body => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            ImageSlot::Header => "header image",
            ImageSlot::Body => "body image",
        }
    }
}

impl<B: Backend + ?Sized> Publisher<'_, B> {
    pub(crate) async fn execute(
        &mut self,
        state: PublishState,
        run: &mut RunContext<'_>,
    ) -> Result<(), PublishError> {
        match state {
            PublishState::AcquireSession => self.acquire_session(run).await,
            PublishState::VerifyLoggedIn => self.verify_logged_in(run).await,
            PublishState::LoginFlow => self.login_flow(run).await,
            PublishState::NavigateToEditor => self.navigate_to_editor().await,
            PublishState::WaitForReady => self.wait_for_ready().await,
            PublishState::SelectContentType => self.select_content_type().await,
            PublishState::AttachHeaderImage => match &run.request.header_image {
                Some(path) => {
                    let verified = self.attach_image(ImageSlot::Header, path).await?;
                    run.facts.header_image_verified = verified;
                    Ok(())
                }
                None => Ok(()),
            },
            PublishState::EnterTitle => self.enter_title(&run.request.title).await,
            PublishState::AttachBodyImage => match &run.request.body_image {
                Some(path) => {
                    let verified = self.attach_image(ImageSlot::Body, path).await?;
                    run.facts.body_image_verified = verified;
                    Ok(())
                }
                None => Ok(()),
            },
            PublishState::EnterBody => self.enter_body(&run.request.body).await,
            PublishState::OpenPublishDialog => self.open_publish_dialog().await,
            PublishState::ConfirmPublish => self.confirm_publish(run).await,
            PublishState::Done => Ok(()),
        }
    }

    async fn acquire_session(&mut self, run: &mut RunContext<'_>) -> Result<(), PublishError> {
        self.backend.launch().await?;

        let session = match self.store.load().await {
            Ok(session) => session,
            Err(e) => {
                run.warn(format!("Stored session could not be read, ignoring it: {}", e));
                None
            }
        };

        match session {
            Some(session) if !session.is_empty() => {
                self.backend.set_cookies(&session.cookies).await?;
                info!(
                    "Restored {} cookies captured at {}",
                    session.cookies.len(),
                    session.captured_at
                );
            }
            _ => info!("No stored session; a login will be required"),
        }
        Ok(())
    }

    async fn verify_logged_in(&mut self, run: &mut RunContext<'_>) -> Result<(), PublishError> {
        let check = self.check_session().await?;
        run.facts.logged_in = check == SessionCheck::Valid;
        match check {
            SessionCheck::Valid => info!("Session is valid"),
            SessionCheck::RedirectedToLogin => info!("Redirected to login; session is not valid"),
        }
        Ok(())
    }

    /// Navigate to the editor entry point and classify where the page ends up.
    async fn check_session(&mut self) -> Result<SessionCheck, PublishError> {
        self.backend.navigate(&self.settings.editor.editor_url).await?;
        let url = self.backend.current_url().await?;
        debug!(url = %url, "Location after editor entry");
        Ok(classify_location(&url, &self.settings.editor.login_markers))
    }

    async fn login_flow(&mut self, run: &mut RunContext<'_>) -> Result<(), PublishError> {
        let wait = self.settings.timeouts.login_wait(self.settings.headless);
        let interval = self.settings.timeouts.poll_interval();

        match self.settings.credentials.clone() {
            Some(credentials) => {
                let element_wait = self.settings.timeouts.element_wait();
                let email = ActionResolver::resolve_within(
                    &mut *self.backend,
                    self.catalog.get(EditorIntent::LoginEmail),
                    element_wait,
                    interval,
                )
                .await?;
                self.backend.type_text(&email, &credentials.email).await?;

                let password = ActionResolver::resolve_within(
                    &mut *self.backend,
                    self.catalog.get(EditorIntent::LoginPassword),
                    element_wait,
                    interval,
                )
                .await?;
                self.backend.type_text(&password, &credentials.password).await?;

                let submit = ActionResolver::resolve_within(
                    &mut *self.backend,
                    self.catalog.get(EditorIntent::LoginSubmit),
                    element_wait,
                    interval,
                )
                .await?;
                self.backend.click(&submit).await?;
                info!("Credentials submitted; waiting up to {:?} for login", wait);
            }
            None if !self.settings.headless => {
                info!("No credentials configured; complete the login in the browser window");
            }
            None => {
                return Err(PublishError::SessionInvalid(
                    "session is not valid and no login credentials are configured".into(),
                ));
            }
        }

        if !self.wait_for_login(wait).await? {
            return Err(PublishError::LoginFailed(format!(
                "no login success signal within {:?}",
                wait
            )));
        }
        run.facts.logged_in = true;
        info!("Login succeeded");

        let cookies = self.backend.get_cookies().await?;
        self.store.save(&Session::new(cookies)).await?;
        Ok(())
    }

    async fn wait_for_login(&mut self, wait: std::time::Duration) -> Result<bool, PublishError> {
        let deadline = Instant::now() + wait;
        loop {
            let url = self.backend.current_url().await?;
            if !self.settings.is_login_location(&url)
                && (self.settings.is_editor_location(&url)
                    || ActionResolver::is_present(
                        &mut *self.backend,
                        self.catalog.get(EditorIntent::LoginSuccess),
                    )
                    .await)
            {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(self.settings.timeouts.poll_interval()).await;
        }
    }

    async fn navigate_to_editor(&mut self) -> Result<(), PublishError> {
        self.backend.navigate(&self.settings.editor.home_url).await?;

        let entry = ActionResolver::resolve_within(
            &mut *self.backend,
            self.catalog.get(EditorIntent::PostEntry),
            self.settings.timeouts.element_wait(),
            self.settings.timeouts.poll_interval(),
        )
        .await;

        match entry {
            Ok(entry) => {
                self.backend.click(&entry).await?;
                sleep(self.settings.timeouts.dialog_settle()).await;
                let url = self.backend.current_url().await?;
                if self.settings.is_editor_location(&url) {
                    info!(url = %url, "Editor opened from the post entry");
                    return Ok(());
                }
                debug!(url = %url, "Post entry did not reach the editor");
            }
            Err(e) => debug!("{}", e),
        }

        info!("Opening the editor directly");
        let nav = self.backend.navigate(&self.settings.editor.editor_url).await?;
        if self.settings.is_login_location(&nav.url) {
            return Err(PublishError::SessionInvalid(format!(
                "editor redirected to {}",
                nav.url
            )));
        }
        Ok(())
    }

    async fn wait_for_ready(&mut self) -> Result<(), PublishError> {
        let attempts = self.settings.timeouts.ready_attempts.max(1);
        for attempt in 1..=attempts {
            if self.wait_until_absent(EditorIntent::LoadingIndicator).await {
                debug!(attempt, "Editor is ready");
                return Ok(());
            }
            if attempt < attempts {
                warn!(attempt, attempts, "Loading indicator persists; reloading");
                self.backend.refresh().await?;
            }
        }
        Err(PublishError::Timeout(format!(
            "loading indicator still present after {} attempts",
            attempts
        )))
    }

    async fn wait_until_absent(&mut self, intent: EditorIntent) -> bool {
        let deadline = Instant::now() + self.settings.timeouts.spinner_wait();
        loop {
            if !ActionResolver::is_present(&mut *self.backend, self.catalog.get(intent)).await {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(self.settings.timeouts.poll_interval()).await;
        }
    }

    async fn select_content_type(&mut self) -> Result<(), PublishError> {
        let found = ActionResolver::resolve_with_retries(
            &mut *self.backend,
            self.catalog.get(EditorIntent::ContentTypeText),
            self.settings.timeouts.content_type_attempts,
            self.settings.timeouts.retry_delay(),
        )
        .await;

        match found {
            Ok(control) => {
                self.backend.click(&control).await?;
                sleep(self.settings.timeouts.retry_delay()).await;
                info!("Selected the text post type");
            }
            Err(_) => debug!("No post type selector; editor opened directly"),
        }
        Ok(())
    }

    /// Attach `file` and report whether the editor shows it afterwards.
    async fn attach_image(&mut self, slot: ImageSlot, file: &Path) -> Result<bool, PublishError> {
        let attempts = self.settings.timeouts.image_verify_attempts;
        let delay = self.settings.timeouts.image_verify_delay();
        let chooser_wait = self.settings.timeouts.file_chooser_wait();

        let placeholder_seen = match slot.placeholder() {
            Some(intent) => ActionResolver::is_present(&mut *self.backend, self.catalog.get(intent)).await,
            None => false,
        };

        let trigger = ActionResolver::resolve_with_retries(
            &mut *self.backend,
            self.catalog.get(slot.trigger()),
            attempts,
            delay,
        )
        .await?;

        let mut attached = self
            .backend
            .click_for_file_chooser(&trigger, file, chooser_wait)
            .await?;

        if !attached {
            debug!("No file chooser from the {} trigger; trying the upload entry", slot.label());
            let entry = ActionResolver::resolve_with_retries(
                &mut *self.backend,
                self.catalog.get(EditorIntent::UploadMenuEntry),
                attempts,
                delay,
            )
            .await?;
            attached = self
                .backend
                .click_for_file_chooser(&entry, file, chooser_wait)
                .await?;
        }

        if !attached {
            return Err(PublishError::Timeout(format!(
                "no file chooser opened for the {}",
                slot.label()
            )));
        }

        for _ in 0..attempts.max(1) {
            sleep(delay).await;
            if self.image_visible(slot, placeholder_seen).await {
                info!("Attached {} {}", slot.label(), file.display());
                return Ok(true);
            }
        }

        Err(PublishError::Timeout(format!(
            "{} not visible after upload",
            slot.label()
        )))
    }

    async fn image_visible(&mut self, slot: ImageSlot, placeholder_seen: bool) -> bool {
        if ActionResolver::is_present(&mut *self.backend, self.catalog.get(slot.image())).await {
            return true;
        }
        match slot.placeholder() {
            Some(intent) if placeholder_seen => {
                !ActionResolver::is_present(&mut *self.backend, self.catalog.get(intent)).await
            }
            _ => false,
        }
    }

    async fn required_element(&mut self, intent: EditorIntent) -> Result<ElementHandle, PublishError> {
        Ok(ActionResolver::resolve_within(
            &mut *self.backend,
            self.catalog.get(intent),
            self.settings.timeouts.element_wait(),
            self.settings.timeouts.poll_interval(),
        )
        .await?)
    }

    async fn enter_title(&mut self, title: &str) -> Result<(), PublishError> {
        let field = self.required_element(EditorIntent::TitleField).await?;
        self.backend.click(&field).await?;
        self.backend.type_text(&field, title).await?;
        info!("Title entered");
        Ok(())
    }

    async fn enter_body(&mut self, body: &str) -> Result<(), PublishError> {
        let field = self.required_element(EditorIntent::BodyField).await?;
        self.backend.click(&field).await?;
        self.backend.insert_text(&field, body).await?;
        info!(chars = body.chars().count(), "Body inserted");
        Ok(())
    }

    async fn open_publish_dialog(&mut self) -> Result<(), PublishError> {
        let control =
            ActionResolver::resolve(&mut *self.backend, self.catalog.get(EditorIntent::PublishDialog))
                .await?;
        self.backend.click(&control).await?;
        sleep(self.settings.timeouts.dialog_settle()).await;
        info!(matched_by = %control.matched_by, "Publish dialog opened");
        Ok(())
    }

    async fn confirm_publish(&mut self, run: &mut RunContext<'_>) -> Result<(), PublishError> {
        let confirm = ActionResolver::resolve_with_retries(
            &mut *self.backend,
            self.catalog.get(EditorIntent::ConfirmPublish),
            self.settings.timeouts.confirm_attempts,
            self.settings.timeouts.retry_delay(),
        )
        .await
        .map_err(|e| PublishError::PublishNotConfirmed(e.to_string()))?;

        self.backend
            .click(&confirm)
            .await
            .map_err(|e| PublishError::PublishNotConfirmed(format!("confirm click failed: {}", e)))?;
        run.facts.confirm_clicked = true;
        info!(matched_by = %confirm.matched_by, "Confirmation clicked");

        self.settle_after_publish().await
    }

    /// Watch the page for a bounded grace period. An error banner fails the
    /// run; leaving the editor ends the wait early.
    async fn settle_after_publish(&mut self) -> Result<(), PublishError> {
        let deadline = Instant::now() + self.settings.timeouts.post_publish_grace();
        loop {
            if let Ok(banner) =
                ActionResolver::resolve(&mut *self.backend, self.catalog.get(EditorIntent::ErrorBanner))
                    .await
            {
                return Err(PublishError::PublishNotConfirmed(format!(
                    "error shown after confirmation ({})",
                    banner.matched_by
                )));
            }
            match self.backend.current_url().await {
                Ok(url) if !self.settings.is_editor_location(&url) => {
                    info!(url = %url, "Left the editor after publishing");
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) => debug!("Could not read location while settling: {}", e),
            }
            if Instant::now() >= deadline {
                debug!("Grace period over without an error");
                return Ok(());
            }
            sleep(self.settings.timeouts.poll_interval()).await;
        }
    }
}
