#![allow(dead_code)]

use async_trait::async_trait;
use scribe_engine::backend::{Backend, BackendError, NavigationResult};
use scribe_engine::intent::definition::LookupStrategy;
use scribe_engine::protocol::{Cookie, ElementHandle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const HOME_URL: &str = "https://note.com/";
pub const NEW_NOTE_URL: &str = "https://note.com/notes/new";
pub const EDITOR_URL: &str = "https://editor.note.com/notes/n1a2b3/edit/";
pub const LOGIN_URL: &str = "https://note.com/login?redirectPath=%2Fnotes%2Fnew";
pub const PUBLISHED_URL: &str = "https://note.com/writer/n/n1a2b3";

/// What clicking an element does to the fake page.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Navigate(String),
    Show(&'static str),
    Hide(&'static str),
    /// The click opens a native file chooser.
    FileChooser,
    /// Marks the browser as authenticated.
    Login,
    Panic,
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub key: &'static str,
    pub tag: &'static str,
    pub selectors: Vec<String>,
    pub text: String,
    pub visible: bool,
    pub on_click: Vec<Effect>,
    /// Hidden once the page has been reloaded this many times; `Some(0)`
    /// means never shown.
    pub gone_after_reloads: Option<u32>,
}

impl FakeElement {
    pub fn new(key: &'static str, tag: &'static str) -> Self {
        Self {
            key,
            tag,
            selectors: Vec::new(),
            text: String::new(),
            visible: true,
            on_click: Vec::new(),
            gone_after_reloads: None,
        }
    }

    pub fn selector(mut self, css: &str) -> Self {
        self.selectors.push(css.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn on_click(mut self, effect: Effect) -> Self {
        self.on_click.push(effect);
        self
    }

    pub fn gone_after_reloads(mut self, n: u32) -> Self {
        self.gone_after_reloads = Some(n);
        self
    }

    fn in_scope(&self, list: &str) -> bool {
        list.split(',')
            .map(str::trim)
            .any(|part| part == self.tag || self.selectors.iter().any(|s| s == part))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Launched,
    CookiesSet(usize),
    Navigated(String),
    Refreshed,
    Queried(String),
    Clicked(&'static str),
    Typed(&'static str, String),
    Inserted(&'static str, String),
    FileChosen(&'static str, PathBuf),
    Closed,
}

/// A scripted site: pages by URL, an authentication flag and an event log.
#[derive(Debug, Default)]
pub struct MockBackend {
    pages: HashMap<String, Vec<FakeElement>>,
    protected: Vec<String>,
    current_url: String,
    current: Vec<FakeElement>,
    reloads: u32,
    pub authenticated: bool,
    pub launched: bool,
    pub closed: bool,
    pub events: Vec<Event>,
    /// Selector strategies with this CSS fail with a script error.
    pub broken_selectors: Vec<String>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, elements: Vec<FakeElement>) -> Self {
        self.pages.insert(url.to_string(), elements);
        self
    }

    pub fn protect(mut self, url: &str) -> Self {
        self.protected.push(url.to_string());
        self
    }

    /// Append an element to one page.
    pub fn add(mut self, url: &str, element: FakeElement) -> Self {
        self.pages.entry(url.to_string()).or_default().push(element);
        self
    }

    /// Remove an element from every page.
    pub fn without(mut self, key: &str) -> Self {
        for elements in self.pages.values_mut() {
            elements.retain(|e| e.key != key);
        }
        self
    }

    /// Change an element on every page.
    pub fn modify(mut self, key: &str, f: impl Fn(&mut FakeElement)) -> Self {
        for elements in self.pages.values_mut() {
            elements.iter_mut().filter(|e| e.key == key).for_each(&f);
        }
        self
    }

    pub fn url(&self) -> &str {
        &self.current_url
    }

    pub fn clicked(&self, key: &str) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, Event::Clicked(k) if *k == key))
    }

    pub fn navigations(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Navigated(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    fn load(&mut self, url: &str) {
        let url = if !self.authenticated && self.protected.iter().any(|p| p == url) {
            LOGIN_URL.to_string()
        } else {
            url.to_string()
        };
        self.current = self.pages.get(&url).cloned().unwrap_or_default();
        for element in &mut self.current {
            if let Some(n) = element.gone_after_reloads
                && self.reloads >= n
            {
                element.visible = false;
            }
        }
        self.current_url = url;
    }

    fn element(&self, handle: &ElementHandle) -> Result<FakeElement, BackendError> {
        self.current
            .get(handle.id as usize)
            .filter(|e| e.visible)
            .cloned()
            .ok_or_else(|| BackendError::Interaction(format!("stale element {}", handle.id)))
    }

    fn apply(&mut self, element: &FakeElement) {
        for effect in &element.on_click {
            match effect {
                Effect::Navigate(url) => self.load(url),
                Effect::Show(key) => self.set_visible(key, true),
                Effect::Hide(key) => self.set_visible(key, false),
                Effect::Login => self.authenticated = true,
                Effect::FileChooser => {}
                Effect::Panic => panic!("page crashed on {}", element.key),
            }
        }
    }

    fn set_visible(&mut self, key: &str, visible: bool) {
        for element in self.current.iter_mut().filter(|e| e.key == key) {
            element.visible = visible;
        }
    }

    fn handle(&self, index: usize, strategy: &LookupStrategy) -> ElementHandle {
        ElementHandle {
            id: index as u32,
            matched_by: strategy.to_string(),
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        self.launched = true;
        self.events.push(Event::Launched);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        self.closed = true;
        self.events.push(Event::Closed);
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError> {
        self.events.push(Event::Navigated(url.to_string()));
        self.load(url);
        Ok(NavigationResult {
            url: self.current_url.clone(),
            title: String::new(),
        })
    }

    async fn current_url(&mut self) -> Result<String, BackendError> {
        Ok(self.current_url.clone())
    }

    async fn refresh(&mut self) -> Result<NavigationResult, BackendError> {
        self.events.push(Event::Refreshed);
        self.reloads += 1;
        let url = self.current_url.clone();
        self.load(&url);
        Ok(NavigationResult {
            url,
            title: String::new(),
        })
    }

    async fn query(
        &mut self,
        strategy: &LookupStrategy,
    ) -> Result<Option<ElementHandle>, BackendError> {
        self.events.push(Event::Queried(strategy.to_string()));
        let visible = self.current.iter().enumerate().filter(|(_, e)| e.visible);

        let found = match strategy {
            LookupStrategy::Selector { css } => {
                if self.broken_selectors.contains(css) {
                    return Err(BackendError::Script(format!("cannot evaluate {}", css)));
                }
                visible
                    .filter(|(_, e)| e.in_scope(css))
                    .map(|(i, _)| i)
                    .next()
            }
            LookupStrategy::Text {
                scope,
                contains,
                exclude,
                max_len,
            } => visible
                .filter(|(_, e)| e.in_scope(scope))
                .filter(|(_, e)| e.text.contains(contains.as_str()))
                .filter(|(_, e)| !exclude.iter().any(|x| e.text.contains(x.as_str())))
                .filter(|(_, e)| max_len.is_none_or(|max| e.text.chars().count() <= max))
                .map(|(i, _)| i)
                .next(),
            LookupStrategy::Position { css, index } => {
                let matches: Vec<usize> = visible
                    .filter(|(_, e)| e.selectors.iter().any(|s| s == css))
                    .map(|(i, _)| i)
                    .collect();
                let pos = if *index < 0 {
                    matches.len().checked_sub(index.unsigned_abs() as usize)
                } else {
                    Some(*index as usize)
                };
                pos.and_then(|p| matches.get(p).copied())
            }
        };
        Ok(found.map(|i| self.handle(i, strategy)))
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), BackendError> {
        let element = self.element(element)?;
        self.events.push(Event::Clicked(element.key));
        self.apply(&element);
        Ok(())
    }

    async fn type_text(&mut self, element: &ElementHandle, text: &str) -> Result<(), BackendError> {
        let element = self.element(element)?;
        self.events.push(Event::Typed(element.key, text.to_string()));
        Ok(())
    }

    async fn insert_text(
        &mut self,
        element: &ElementHandle,
        text: &str,
    ) -> Result<(), BackendError> {
        let element = self.element(element)?;
        self.events.push(Event::Inserted(element.key, text.to_string()));
        Ok(())
    }

    async fn click_for_file_chooser(
        &mut self,
        element: &ElementHandle,
        file: &Path,
        wait: Duration,
    ) -> Result<bool, BackendError> {
        let element = self.element(element)?;
        self.events.push(Event::Clicked(element.key));
        self.apply(&element);
        if element.on_click.contains(&Effect::FileChooser) {
            self.events
                .push(Event::FileChosen(element.key, file.to_path_buf()));
            Ok(true)
        } else {
            tokio::time::sleep(wait).await;
            Ok(false)
        }
    }

    async fn page_content(&mut self) -> Result<String, BackendError> {
        Ok(format!("<html><!-- {} --></html>", self.current_url))
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, BackendError> {
        Ok(b"\x89PNG".to_vec())
    }

    async fn get_cookies(&mut self) -> Result<Vec<Cookie>, BackendError> {
        if self.authenticated {
            Ok(vec![Cookie::new("_note_session_v5", "fresh").with_domain(".note.com")])
        } else {
            Ok(Vec::new())
        }
    }

    async fn set_cookies(&mut self, cookies: &[Cookie]) -> Result<(), BackendError> {
        self.events.push(Event::CookiesSet(cookies.len()));
        if cookies
            .iter()
            .any(|c| c.name == "_note_session_v5" && c.value != "expired")
        {
            self.authenticated = true;
        }
        Ok(())
    }
}

fn editor_page() -> Vec<FakeElement> {
    vec![
        FakeElement::new("spinner", "div")
            .selector(".sc-e17b66d3-0")
            .gone_after_reloads(0),
        FakeElement::new("type_text", "button").text("テキスト"),
        FakeElement::new("eyecatch_placeholder", "div")
            .selector("[data-testid=\"eyecatch-placeholder\"]"),
        FakeElement::new("eyecatch_button", "button")
            .selector("button[aria-label=\"画像を追加\"]")
            .on_click(Effect::FileChooser)
            .on_click(Effect::Hide("eyecatch_placeholder"))
            .on_click(Effect::Show("eyecatch_img")),
        FakeElement::new("eyecatch_img", "img")
            .selector("[data-testid=\"eyecatch\"] img")
            .hidden(),
        FakeElement::new("title", "textarea").selector("textarea[placeholder=\"記事タイトル\"]"),
        FakeElement::new("body", "div")
            .selector(".editor-input[contenteditable=\"true\"]")
            .selector("[contenteditable=\"true\"]"),
        FakeElement::new("body_image_button", "button")
            .selector("button[aria-label=\"画像\"]")
            .on_click(Effect::Show("upload_entry")),
        FakeElement::new("upload_entry", "button")
            .text("画像をアップロード")
            .hidden()
            .on_click(Effect::FileChooser)
            .on_click(Effect::Show("body_img")),
        FakeElement::new("body_img", "img")
            .selector(".editor-input figure img")
            .hidden(),
        FakeElement::new("publish_settings", "button")
            .text("公開設定")
            .on_click(Effect::Show("confirm")),
        FakeElement::new("confirm", "button")
            .text("投稿する")
            .hidden()
            .on_click(Effect::Navigate(PUBLISHED_URL.to_string())),
    ]
}

/// A site with a home page, a login page and an editor behind the login.
pub fn note_site() -> MockBackend {
    MockBackend::new()
        .page(
            HOME_URL,
            vec![
                FakeElement::new("global_header", "header").selector(".o-globalHeader"),
                FakeElement::new("post_entry", "a")
                    .selector("a[href=\"/new\"]")
                    .text("投稿")
                    .on_click(Effect::Navigate(EDITOR_URL.to_string())),
            ],
        )
        .page(
            LOGIN_URL,
            vec![
                FakeElement::new("email", "input").selector("input[name=\"login\"]"),
                FakeElement::new("password", "input").selector("input[name=\"password\"]"),
                FakeElement::new("login_button", "button")
                    .text("ログイン")
                    .on_click(Effect::Login)
                    .on_click(Effect::Navigate(HOME_URL.to_string())),
            ],
        )
        .page(NEW_NOTE_URL, editor_page())
        .page(EDITOR_URL, editor_page())
        .page(PUBLISHED_URL, vec![])
        .protect(NEW_NOTE_URL)
        .protect(EDITOR_URL)
}

pub fn valid_cookie() -> Cookie {
    Cookie::new("_note_session_v5", "stored").with_domain(".note.com")
}

pub fn expired_cookie() -> Cookie {
    Cookie::new("_note_session_v5", "expired").with_domain(".note.com")
}
