use thiserror::Error;

/// No strategy of an intent yielded a visible element.
#[derive(Debug, Clone, Error)]
#[error("Intent '{intent}' not found (tried: {})", attempted.join(", "))]
pub struct ResolutionError {
    pub intent: String,
    /// Strategies tried, in order, with the reason each one missed.
    pub attempted: Vec<String>,
}

impl ResolutionError {
    pub fn new(intent: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            attempted: Vec::new(),
        }
    }
}
