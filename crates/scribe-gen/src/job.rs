use chrono::{DateTime, Utc};
use scribe_common::config::PollPolicyConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Image,
    Video,
}

impl JobKind {
    /// Service defaults: images finish in seconds, videos in minutes.
    pub fn default_policy(self) -> PollPolicy {
        match self {
            JobKind::Image => PollPolicy::new(Duration::from_secs(5), 120),
            JobKind::Video => PollPolicy::new(Duration::from_secs(10), 60),
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Image => f.write_str("image"),
            JobKind::Video => f.write_str("video"),
        }
    }
}

/// Generation options. Which fields a backend reads depends on the kind and
/// the model; unset fields fall back to backend defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// Source image for image-to-video.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Task whose result is extended by this job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_task_id: Option<String>,
}

impl GenerationParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(ratio.into());
        self
    }

    pub fn duration_secs(mut self, secs: u32) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    pub fn resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }

    pub fn image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn extending(mut self, origin_task_id: impl Into<String>) -> Self {
        self.origin_task_id = Some(origin_task_id.into());
        self
    }
}

/// A submitted job. Immutable; referenced by `task_id` afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationJob {
    task_id: String,
    submitted_at: DateTime<Utc>,
    kind: JobKind,
    params: GenerationParams,
}

impl GenerationJob {
    pub fn new(
        task_id: impl Into<String>,
        submitted_at: DateTime<Utc>,
        kind: JobKind,
        params: GenerationParams,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            submitted_at,
            kind,
            params,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }
}

/// Fixed-interval polling budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Longest time a poll loop can take, ignoring request latency.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl From<PollPolicyConfig> for PollPolicy {
    fn from(config: PollPolicyConfig) -> Self {
        Self::new(Duration::from_millis(config.interval_ms), config.max_attempts)
    }
}
