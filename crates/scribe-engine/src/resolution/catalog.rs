//! Built-in action intents for the web editor.
//!
//! Selectors and labels reflect the editor markup as last observed; the UI copy
//! changes without notice, which is why most intents carry several variants.
//! Any intent can be replaced from configuration by name.

use scribe_common::intent::definition::{ActionIntent, LookupStrategy as S};
use std::fmt;
use tracing::warn;

/// Toasts and alerts that can carry an error, minus the route announcer.
const ERROR_SCOPE: &str = "[role=\"alert\"]:not([aria-live]):not(#__next-route-announcer__), \
[role=\"alertdialog\"], [class*=\"toast\" i], [class*=\"snackbar\" i]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorIntent {
    LoginEmail,
    LoginPassword,
    LoginSubmit,
    LoginSuccess,
    PostEntry,
    LoadingIndicator,
    ContentTypeText,
    HeaderImageTrigger,
    HeaderImagePlaceholder,
    HeaderImage,
    UploadMenuEntry,
    TitleField,
    BodyImageTrigger,
    BodyImage,
    BodyField,
    PublishDialog,
    ConfirmPublish,
    ErrorBanner,
}

impl EditorIntent {
    pub const ALL: [EditorIntent; 18] = [
        EditorIntent::LoginEmail,
        EditorIntent::LoginPassword,
        EditorIntent::LoginSubmit,
        EditorIntent::LoginSuccess,
        EditorIntent::PostEntry,
        EditorIntent::LoadingIndicator,
        EditorIntent::ContentTypeText,
        EditorIntent::HeaderImageTrigger,
        EditorIntent::HeaderImagePlaceholder,
        EditorIntent::HeaderImage,
        EditorIntent::UploadMenuEntry,
        EditorIntent::TitleField,
        EditorIntent::BodyImageTrigger,
        EditorIntent::BodyImage,
        EditorIntent::BodyField,
        EditorIntent::PublishDialog,
        EditorIntent::ConfirmPublish,
        EditorIntent::ErrorBanner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EditorIntent::LoginEmail => "login_email",
            EditorIntent::LoginPassword => "login_password",
            EditorIntent::LoginSubmit => "login_submit",
            EditorIntent::LoginSuccess => "login_success",
            EditorIntent::PostEntry => "post_entry",
            EditorIntent::LoadingIndicator => "loading_indicator",
            EditorIntent::ContentTypeText => "content_type_text",
            EditorIntent::HeaderImageTrigger => "header_image_trigger",
            EditorIntent::HeaderImagePlaceholder => "header_image_placeholder",
            EditorIntent::HeaderImage => "header_image",
            EditorIntent::UploadMenuEntry => "upload_menu_entry",
            EditorIntent::TitleField => "title_field",
            EditorIntent::BodyImageTrigger => "body_image_trigger",
            EditorIntent::BodyImage => "body_image",
            EditorIntent::BodyField => "body_field",
            EditorIntent::PublishDialog => "publish_dialog",
            EditorIntent::ConfirmPublish => "confirm_publish",
            EditorIntent::ErrorBanner => "error_banner",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.as_str() == name)
    }

    fn index(self) -> usize {
        self as usize
    }

    fn builtin(self) -> ActionIntent {
        let strategies = match self {
            EditorIntent::LoginEmail => vec![S::selector("input[name=\"login\"]"), S::selector("#email")],
            EditorIntent::LoginPassword => {
                vec![S::selector("input[name=\"password\"]"), S::selector("#password")]
            }
            EditorIntent::LoginSubmit => vec![
                S::text("button", "ログイン"),
                S::selector("button[data-type=\"primaryNext\"]"),
            ],
            EditorIntent::LoginSuccess => vec![
                S::selector(".o-globalHeader"),
                S::selector("textarea[placeholder=\"記事タイトル\"]"),
            ],
            EditorIntent::PostEntry => vec![
                S::selector("a[href=\"/new\"]"),
                S::selector("a[href=\"https://note.com/new\"]"),
                S::short_text("a, button", "投稿", 10),
            ],
            EditorIntent::LoadingIndicator => vec![
                S::selector(".sc-e17b66d3-0"),
                S::selector("[aria-busy=\"true\"]"),
                S::selector("[role=\"progressbar\"]"),
            ],
            EditorIntent::ContentTypeText => vec![S::short_text(
                "button, a, div[role=\"button\"]",
                "テキスト",
                10,
            )],
            EditorIntent::HeaderImageTrigger => vec![
                S::selector("button[aria-label=\"画像を追加\"]"),
                S::short_text("button", "見出し画像", 20),
            ],
            EditorIntent::HeaderImagePlaceholder => vec![
                S::selector("[data-testid=\"eyecatch-placeholder\"]"),
                S::short_text("div, button", "見出し画像を追加", 20),
            ],
            EditorIntent::HeaderImage => vec![
                S::selector("[data-testid=\"eyecatch\"] img"),
                S::selector("figure.eyecatch img"),
            ],
            EditorIntent::UploadMenuEntry => vec![
                S::short_text("button, li, [role=\"menuitem\"]", "画像をアップロード", 20),
                S::short_text("button, li, [role=\"menuitem\"]", "アップロード", 20),
                S::short_text("button, li, [role=\"menuitem\"]", "Upload", 20),
            ],
            EditorIntent::TitleField => vec![
                S::selector("textarea[placeholder=\"記事タイトル\"]"),
                S::selector("[data-placeholder=\"記事タイトル\"]"),
            ],
            EditorIntent::BodyImageTrigger => vec![
                S::selector("button[aria-label=\"画像\"]"),
                S::selector("button[aria-label=\"メニューを開く\"]"),
            ],
            EditorIntent::BodyImage => vec![
                S::selector(".editor-input figure img"),
                S::selector("[contenteditable=\"true\"] img"),
            ],
            EditorIntent::BodyField => vec![
                S::selector(".editor-input[contenteditable=\"true\"]"),
                S::selector(".ProseMirror[contenteditable=\"true\"]"),
                S::position("[contenteditable=\"true\"]", -1),
            ],
            EditorIntent::PublishDialog => vec![
                S::text("button", "公開設定"),
                S::text_excluding("button", "公開", &["予約"]),
                S::text("button", "Publish"),
                S::selector(
                    "button[aria-label=\"公開設定\"], button.o-noteEditorHeader__publish",
                ),
            ],
            EditorIntent::ConfirmPublish => vec![
                S::text_excluding("button", "投稿", &["予約"]),
                S::text_excluding("button", "公開", &["予約", "設定"]),
                S::selector("[role=\"dialog\"] button[type=\"submit\"]"),
                S::position("[role=\"dialog\"] button", -1),
            ],
            // Live regions also announce page titles, so a match needs error text.
            EditorIntent::ErrorBanner => vec![
                S::short_text(ERROR_SCOPE, "エラー", 120),
                S::short_text(ERROR_SCOPE, "失敗", 120),
                S::short_text(ERROR_SCOPE, "できませんでした", 120),
            ],
        };
        ActionIntent::new(self.as_str(), strategies)
    }
}

impl fmt::Display for EditorIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intent table used by a publish run: built-ins, optionally replaced by
/// configured definitions.
#[derive(Debug, Clone)]
pub struct IntentCatalog {
    intents: Vec<ActionIntent>,
}

impl Default for IntentCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl IntentCatalog {
    pub fn builtin() -> Self {
        Self {
            intents: EditorIntent::ALL.into_iter().map(EditorIntent::builtin).collect(),
        }
    }

    /// Built-ins with configured overrides applied in order.
    pub fn with_overrides(overrides: &[ActionIntent]) -> Self {
        let mut catalog = Self::builtin();
        for intent in overrides {
            catalog.register(intent.clone());
        }
        catalog
    }

    /// Replace the definition of a known intent.
    /// Returns false (and keeps the current definition) for unknown names or
    /// definitions without strategies.
    pub fn register(&mut self, intent: ActionIntent) -> bool {
        let Some(key) = EditorIntent::from_name(&intent.name) else {
            warn!("Ignoring override for unknown intent '{}'", intent.name);
            return false;
        };
        if intent.strategies.is_empty() {
            warn!("Ignoring override for '{}': no strategies", intent.name);
            return false;
        }
        self.intents[key.index()] = intent;
        true
    }

    pub fn get(&self, key: EditorIntent) -> &ActionIntent {
        &self.intents[key.index()]
    }
}
