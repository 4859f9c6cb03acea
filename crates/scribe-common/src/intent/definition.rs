use serde::{Deserialize, Serialize};
use std::fmt;

/// One concrete way of locating an element on the page.
///
/// Strategies are cheap, side-effect free lookups. A strategy only ever
/// yields an element that exists and is visible; it never guesses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LookupStrategy {
    /// First visible element matching a CSS selector.
    Selector { css: String },

    /// First visible element within `scope` (a CSS selector list) whose
    /// rendered text contains `contains` and none of `exclude`.
    Text {
        scope: String,
        contains: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        exclude: Vec<String>,
        /// Ignore elements whose text is longer than this (filters out
        /// containers that merely wrap the label).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_len: Option<usize>,
    },

    /// The n-th visible element matching `css`. Negative indices count from
    /// the end (`-1` is the last match).
    Position { css: String, index: i32 },
}

impl LookupStrategy {
    pub fn selector(css: impl Into<String>) -> Self {
        Self::Selector { css: css.into() }
    }

    pub fn text(scope: impl Into<String>, contains: impl Into<String>) -> Self {
        Self::Text {
            scope: scope.into(),
            contains: contains.into(),
            exclude: Vec::new(),
            max_len: None,
        }
    }

    pub fn text_excluding(
        scope: impl Into<String>,
        contains: impl Into<String>,
        exclude: &[&str],
    ) -> Self {
        Self::Text {
            scope: scope.into(),
            contains: contains.into(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
            max_len: None,
        }
    }

    pub fn short_text(scope: impl Into<String>, contains: impl Into<String>, max_len: usize) -> Self {
        Self::Text {
            scope: scope.into(),
            contains: contains.into(),
            exclude: Vec::new(),
            max_len: Some(max_len),
        }
    }

    pub fn position(css: impl Into<String>, index: i32) -> Self {
        Self::Position {
            css: css.into(),
            index,
        }
    }
}

impl fmt::Display for LookupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupStrategy::Selector { css } => write!(f, "selector({})", css),
            LookupStrategy::Text {
                scope,
                contains,
                exclude,
                ..
            } => {
                if exclude.is_empty() {
                    write!(f, "text({} ~ {:?})", scope, contains)
                } else {
                    write!(f, "text({} ~ {:?} !{:?})", scope, contains, exclude)
                }
            }
            LookupStrategy::Position { css, index } => write!(f, "position({}[{}])", css, index),
        }
    }
}

/// A semantic UI goal with its ordered fallback strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionIntent {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tried strictly in declared order; the first visible match wins.
    pub strategies: Vec<LookupStrategy>,
}

impl ActionIntent {
    pub fn new(name: impl Into<String>, strategies: Vec<LookupStrategy>) -> Self {
        Self {
            name: name.into(),
            description: None,
            strategies,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategies_deserialize_from_yaml() {
        let yaml = r#"
name: publish_dialog
strategies:
  - kind: text
    scope: button
    contains: "Publish"
  - kind: selector
    css: "button.publish"
  - kind: position
    css: "header button"
    index: -1
"#;
        let intent: ActionIntent = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(intent.name, "publish_dialog");
        assert_eq!(intent.strategies.len(), 3);
        assert_eq!(intent.strategies[0], LookupStrategy::text("button", "Publish"));
        assert_eq!(intent.strategies[2], LookupStrategy::position("header button", -1));
    }

    #[test]
    fn test_display_is_compact() {
        let s = LookupStrategy::text_excluding("button", "投稿", &["予約"]);
        assert_eq!(s.to_string(), "text(button ~ \"投稿\" ![\"予約\"])");
        assert_eq!(
            LookupStrategy::selector("#email").to_string(),
            "selector(#email)"
        );
    }
}
