//! Lookup strategies evaluated in the page.
//!
//! Each strategy becomes one self-contained expression. A match is tagged with
//! a `data-scribe-id` attribute so later calls can address it by selector; no
//! other page state is touched.

use scribe_engine::error::BackendError;
use scribe_engine::intent::definition::LookupStrategy;
use serde::{Deserialize, Serialize};

pub const MARKER_ATTRIBUTE: &str = "data-scribe-id";

#[derive(Debug, Serialize)]
struct LookupQuery<'a> {
    kind: &'static str,
    css: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    contains: Option<&'a str>,
    exclude: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<i32>,
}

impl<'a> From<&'a LookupStrategy> for LookupQuery<'a> {
    fn from(strategy: &'a LookupStrategy) -> Self {
        match strategy {
            LookupStrategy::Selector { css } => LookupQuery {
                kind: "selector",
                css,
                contains: None,
                exclude: &[],
                max_len: None,
                index: None,
            },
            LookupStrategy::Text {
                scope,
                contains,
                exclude,
                max_len,
            } => LookupQuery {
                kind: "text",
                css: scope,
                contains: Some(contains.as_str()),
                exclude,
                max_len: *max_len,
                index: None,
            },
            LookupStrategy::Position { css, index } => LookupQuery {
                kind: "position",
                css,
                contains: None,
                exclude: &[],
                max_len: None,
                index: Some(*index),
            },
        }
    }
}

const LOOKUP_BODY: &str = r#"
  const visible = (el) => {
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    // Screen-reader-only nodes are clipped to a single pixel.
    return rect.width > 1 && rect.height > 1
      && style.visibility !== 'hidden' && style.display !== 'none';
  };
  let candidates;
  try {
    candidates = Array.from(document.querySelectorAll(query.css)).filter(visible);
  } catch (e) {
    return { found: false, error: String(e) };
  }
  let el = null;
  if (query.kind === 'selector') {
    el = candidates[0] || null;
  } else if (query.kind === 'text') {
    el = candidates.find((c) => {
      const text = (c.innerText || c.textContent || '').trim();
      if (!text.includes(query.contains)) return false;
      if (query.exclude.some((x) => text.includes(x))) return false;
      return query.max_len == null || Array.from(text).length <= query.max_len;
    }) || null;
  } else if (query.kind === 'position') {
    const i = query.index < 0 ? candidates.length + query.index : query.index;
    el = (i >= 0 && candidates[i]) || null;
  }
  if (!el) return { found: false };
  if (!el.hasAttribute(MARKER)) {
    window.__scribeSeq = (window.__scribeSeq || 0) + 1;
    el.setAttribute(MARKER, String(window.__scribeSeq));
  }
  return { found: true, id: Number(el.getAttribute(MARKER)) };
"#;

/// The expression evaluating `strategy` against the live document.
pub fn lookup_script(strategy: &LookupStrategy) -> Result<String, BackendError> {
    let query = serde_json::to_string(&LookupQuery::from(strategy))?;
    Ok(format!(
        "(() => {{\n  const query = {};\n  const MARKER = '{}';{}}})()",
        query, MARKER_ATTRIBUTE, LOOKUP_BODY
    ))
}

/// Selector addressing an element tagged by a query.
pub fn marker_selector(id: u32) -> String {
    format!("[{}=\"{}\"]", MARKER_ATTRIBUTE, id)
}

#[derive(Debug, Default, Deserialize)]
pub struct LookupResult {
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
}

impl LookupResult {
    /// Element id of a match. An invalid selector surfaces as an error so the
    /// resolver records it as a failed attempt.
    pub fn into_match(self) -> Result<Option<u32>, BackendError> {
        if let Some(error) = self.error {
            return Err(BackendError::Script(error));
        }
        Ok(if self.found { self.id } else { None })
    }
}
