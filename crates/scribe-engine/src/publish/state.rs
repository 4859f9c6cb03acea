use std::fmt;

/// States of one publish run, in the order they are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublishState {
    AcquireSession,
    VerifyLoggedIn,
    LoginFlow,
    NavigateToEditor,
    WaitForReady,
    SelectContentType,
    AttachHeaderImage,
    EnterTitle,
    AttachBodyImage,
    EnterBody,
    OpenPublishDialog,
    ConfirmPublish,
    Done,
}

/// What a failing state does to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Capture diagnostics and fail the run.
    Abort,
    /// Record a warning and move on; the run may still publish.
    Continue,
}

/// Facts gathered while the run progresses; transition guards read them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFacts {
    pub logged_in: bool,
    pub has_header_image: bool,
    pub has_body_image: bool,
    pub header_image_verified: bool,
    pub body_image_verified: bool,
    pub confirm_clicked: bool,
}

impl PublishState {
    /// Transition guard: the state that follows `self` given what is known.
    pub fn next(self, facts: &RunFacts) -> PublishState {
        use PublishState::*;
        match self {
            AcquireSession => VerifyLoggedIn,
            VerifyLoggedIn if facts.logged_in => NavigateToEditor,
            VerifyLoggedIn => LoginFlow,
            LoginFlow => NavigateToEditor,
            NavigateToEditor => WaitForReady,
            WaitForReady => SelectContentType,
            SelectContentType if facts.has_header_image => AttachHeaderImage,
            SelectContentType | AttachHeaderImage => EnterTitle,
            EnterTitle if facts.has_body_image => AttachBodyImage,
            EnterTitle | AttachBodyImage => EnterBody,
            EnterBody => OpenPublishDialog,
            OpenPublishDialog => ConfirmPublish,
            ConfirmPublish | Done => Done,
        }
    }

    /// Per-state failure policy. Image attachment and page readiness are
    /// enhancements; everything that decides whether text was published aborts.
    pub fn policy(self) -> FailurePolicy {
        use PublishState::*;
        match self {
            WaitForReady | SelectContentType | AttachHeaderImage | AttachBodyImage => {
                FailurePolicy::Continue
            }
            AcquireSession | VerifyLoggedIn | LoginFlow | NavigateToEditor | EnterTitle
            | EnterBody | OpenPublishDialog | ConfirmPublish | Done => FailurePolicy::Abort,
        }
    }

    /// Stage name used for diagnostic artifact file names.
    pub fn diagnostic_stage(self) -> &'static str {
        use PublishState::*;
        match self {
            AcquireSession | VerifyLoggedIn | LoginFlow => "login",
            OpenPublishDialog | ConfirmPublish | Done => "publish",
            _ => "post",
        }
    }

    pub fn as_str(self) -> &'static str {
        use PublishState::*;
        match self {
            AcquireSession => "acquire_session",
            VerifyLoggedIn => "verify_logged_in",
            LoginFlow => "login_flow",
            NavigateToEditor => "navigate_to_editor",
            WaitForReady => "wait_for_ready",
            SelectContentType => "select_content_type",
            AttachHeaderImage => "attach_header_image",
            EnterTitle => "enter_title",
            AttachBodyImage => "attach_body_image",
            EnterBody => "enter_body",
            OpenPublishDialog => "open_publish_dialog",
            ConfirmPublish => "confirm_publish",
            Done => "done",
        }
    }
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
