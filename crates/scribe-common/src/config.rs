use crate::intent::definition::ActionIntent;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScribeConfig {
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Overrides for built-in action intents, matched by name.
    #[serde(default)]
    pub intents: Vec<ActionIntent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Landing page that carries the "post" entry control.
    #[serde(default = "default_home_url")]
    pub home_url: String,
    /// Editor entry point; also used to verify the session.
    #[serde(default = "default_editor_url")]
    pub editor_url: String,
    /// A location containing any of these is a login surface.
    #[serde(default = "default_login_markers")]
    pub login_markers: Vec<String>,
    /// A location containing any of these is the editor.
    #[serde(default = "default_editor_markers")]
    pub editor_markers: Vec<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            home_url: default_home_url(),
            editor_url: default_editor_url(),
            login_markers: default_login_markers(),
            editor_markers: default_editor_markers(),
        }
    }
}

fn default_home_url() -> String {
    "https://note.com/".to_string()
}

fn default_editor_url() -> String {
    "https://note.com/notes/new".to_string()
}

fn default_login_markers() -> Vec<String> {
    vec!["/login".to_string()]
}

fn default_editor_markers() -> Vec<String> {
    vec!["/notes/new".to_string(), "/edit".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_bin: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_dir: Option<PathBuf>,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_bin: None,
            user_data_dir: None,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    800
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_path")]
    pub path: PathBuf,
    /// Environment variable whose content seeds the session file when the
    /// file does not exist yet (non-interactive environments).
    #[serde(default = "default_seed_env")]
    pub seed_env: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: default_session_path(),
            seed_env: default_seed_env(),
        }
    }
}

fn default_session_path() -> PathBuf {
    PathBuf::from("note_cookies.json")
}

fn default_seed_env() -> String {
    "NOTE_COOKIES_JSON".to_string()
}

/// Names of the environment variables holding login credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_email_env")]
    pub email_env: String,
    #[serde(default = "default_password_env")]
    pub password_env: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            email_env: default_email_env(),
            password_env: default_password_env(),
        }
    }
}

fn default_email_env() -> String {
    "NOTE_EMAIL".to_string()
}

fn default_password_env() -> String {
    "NOTE_PASSWORD".to_string()
}

/// Every bounded wait and retry budget of a publish run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// How long to wait for a required input surface (title, body, login fields).
    #[serde(default = "default_element_wait_ms")]
    pub element_wait_ms: u64,
    /// Headless wait for a login success signal.
    #[serde(default = "default_login_wait_ms")]
    pub login_wait_ms: u64,
    /// Visible-browser wait for a login success signal (operator solves a challenge).
    #[serde(default = "default_manual_login_wait_ms")]
    pub manual_login_wait_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How long one loading indicator may persist before the page is reloaded.
    #[serde(default = "default_spinner_wait_ms")]
    pub spinner_wait_ms: u64,
    #[serde(default = "default_ready_attempts")]
    pub ready_attempts: u32,
    #[serde(default = "default_content_type_attempts")]
    pub content_type_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_file_chooser_wait_ms")]
    pub file_chooser_wait_ms: u64,
    #[serde(default = "default_image_verify_attempts")]
    pub image_verify_attempts: u32,
    #[serde(default = "default_image_verify_delay_ms")]
    pub image_verify_delay_ms: u64,
    #[serde(default = "default_dialog_settle_ms")]
    pub dialog_settle_ms: u64,
    #[serde(default = "default_confirm_attempts")]
    pub confirm_attempts: u32,
    #[serde(default = "default_post_publish_grace_ms")]
    pub post_publish_grace_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            element_wait_ms: default_element_wait_ms(),
            login_wait_ms: default_login_wait_ms(),
            manual_login_wait_ms: default_manual_login_wait_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            spinner_wait_ms: default_spinner_wait_ms(),
            ready_attempts: default_ready_attempts(),
            content_type_attempts: default_content_type_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            file_chooser_wait_ms: default_file_chooser_wait_ms(),
            image_verify_attempts: default_image_verify_attempts(),
            image_verify_delay_ms: default_image_verify_delay_ms(),
            dialog_settle_ms: default_dialog_settle_ms(),
            confirm_attempts: default_confirm_attempts(),
            post_publish_grace_ms: default_post_publish_grace_ms(),
        }
    }
}

impl TimeoutConfig {
    pub fn element_wait(&self) -> Duration {
        Duration::from_millis(self.element_wait_ms)
    }

    pub fn login_wait(&self, headless: bool) -> Duration {
        if headless {
            Duration::from_millis(self.login_wait_ms)
        } else {
            Duration::from_millis(self.manual_login_wait_ms)
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn spinner_wait(&self) -> Duration {
        Duration::from_millis(self.spinner_wait_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn file_chooser_wait(&self) -> Duration {
        Duration::from_millis(self.file_chooser_wait_ms)
    }

    pub fn image_verify_delay(&self) -> Duration {
        Duration::from_millis(self.image_verify_delay_ms)
    }

    pub fn dialog_settle(&self) -> Duration {
        Duration::from_millis(self.dialog_settle_ms)
    }

    pub fn post_publish_grace(&self) -> Duration {
        Duration::from_millis(self.post_publish_grace_ms)
    }
}

fn default_element_wait_ms() -> u64 {
    30_000
}

fn default_login_wait_ms() -> u64 {
    20_000
}

fn default_manual_login_wait_ms() -> u64 {
    180_000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_spinner_wait_ms() -> u64 {
    30_000
}

fn default_ready_attempts() -> u32 {
    3
}

fn default_content_type_attempts() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_file_chooser_wait_ms() -> u64 {
    3_000
}

fn default_image_verify_attempts() -> u32 {
    10
}

fn default_image_verify_delay_ms() -> u64 {
    500
}

fn default_dialog_settle_ms() -> u64 {
    2_000
}

fn default_confirm_attempts() -> u32 {
    5
}

fn default_post_publish_grace_ms() -> u64 {
    15_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    #[serde(default = "default_diagnostics_dir")]
    pub dir: PathBuf,
    /// Artifacts are written as `{prefix}_{stage}_error.html` / `.png`.
    #[serde(default = "default_diagnostics_prefix")]
    pub prefix: String,
    #[serde(default = "default_true")]
    pub screenshot: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            dir: default_diagnostics_dir(),
            prefix: default_diagnostics_prefix(),
            screenshot: true,
        }
    }
}

fn default_diagnostics_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_diagnostics_prefix() -> String {
    "note".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_jobs_base_url")]
    pub jobs_base_url: String,
    #[serde(default = "default_veo_base_url")]
    pub veo_base_url: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_video_model")]
    pub video_model: String,
    #[serde(default = "default_veo_model")]
    pub veo_model: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_image_policy")]
    pub image_poll: PollPolicyConfig,
    #[serde(default = "default_video_policy")]
    pub video_poll: PollPolicyConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            jobs_base_url: default_jobs_base_url(),
            veo_base_url: default_veo_base_url(),
            image_model: default_image_model(),
            video_model: default_video_model(),
            veo_model: default_veo_model(),
            request_timeout_ms: default_request_timeout_ms(),
            image_poll: default_image_policy(),
            video_poll: default_video_policy(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicyConfig {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

fn default_api_key_env() -> String {
    "KEI_AI_API_KEY".to_string()
}

fn default_jobs_base_url() -> String {
    "https://api.kie.ai/api/v1/jobs".to_string()
}

fn default_veo_base_url() -> String {
    "https://api.kie.ai/api/v1/veo".to_string()
}

fn default_image_model() -> String {
    "seedream/4.5-text-to-image".to_string()
}

fn default_video_model() -> String {
    "kling-2.6/image-to-video".to_string()
}

fn default_veo_model() -> String {
    "veo3".to_string()
}

fn default_request_timeout_ms() -> u64 {
    60_000
}

fn default_image_policy() -> PollPolicyConfig {
    PollPolicyConfig {
        interval_ms: 5_000,
        max_attempts: 120,
    }
}

fn default_video_policy() -> PollPolicyConfig {
    PollPolicyConfig {
        interval_ms: 10_000,
        max_attempts: 60,
    }
}
