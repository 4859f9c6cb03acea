use thiserror::Error;

/// Job creation failed. Never retried by the poller; the caller decides
/// whether to resubmit.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("API key is not configured (set {0})")]
    MissingApiKey(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Service rejected the job (code {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// A single status request failed. Inside a poll loop this is an unclassified
/// observation, not a terminal error.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("API key is not configured (set {0})")]
    MissingApiKey(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("Generation failed for task {task_id}: {reason}")]
    GenerationFailed { task_id: String, reason: String },

    #[error("Task {task_id} did not finish after {attempts} status checks")]
    Timeout { task_id: String, attempts: u32 },
}

pub(crate) fn map_http_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timeout: {}", error)
    } else if error.is_connect() {
        format!("connection error: {}", error)
    } else {
        error.to_string()
    }
}
