//! Client for the generic jobs API (`/createTask`, `/recordInfo`).

use crate::backend::GenerationBackend;
use crate::error::{PollError, SubmissionError};
use crate::http::{self, Envelope};
use crate::job::{GenerationParams, JobKind};
use crate::status::PollObservation;
use async_trait::async_trait;
use reqwest::Client;
use scribe_common::config::GenerationConfig;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_IMAGE_ASPECT: &str = "9:16";
const DEFAULT_VIDEO_DURATION: u32 = 5;
const DEFAULT_RESOLUTION: &str = "1080P";

pub struct JobsClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    api_key_env: String,
    image_model: String,
    video_model: String,
}

impl JobsClient {
    /// `api_key` may be absent for dry runs; requests then fail with
    /// `MissingApiKey`.
    pub fn from_config(
        config: &GenerationConfig,
        api_key: Option<String>,
    ) -> Result<Self, SubmissionError> {
        Ok(Self {
            http: http::build_client(Duration::from_millis(config.request_timeout_ms))?,
            base_url: config.jobs_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            api_key_env: config.api_key_env.clone(),
            image_model: config.image_model.clone(),
            video_model: config.video_model.clone(),
        })
    }

    fn image_input(params: &GenerationParams) -> Value {
        json!({
            "prompt": params.prompt,
            "aspect_ratio": params.aspect_ratio.as_deref().unwrap_or(DEFAULT_IMAGE_ASPECT),
            "quality": "high",
        })
    }

    fn video_input(model: &str, params: &GenerationParams) -> Result<Value, SubmissionError> {
        let image_url = params.image_url.as_deref().ok_or_else(|| {
            SubmissionError::Unsupported("image-to-video requires a source image URL".into())
        })?;

        let mut input = json!({
            "prompt": params.prompt,
            "sound": false,
            "duration": params.duration_secs.unwrap_or(DEFAULT_VIDEO_DURATION).to_string(),
        });
        // Hailuo models take a single image and an explicit resolution.
        if model.contains("hailuo") {
            input["image_url"] = json!(image_url);
            input["resolution"] =
                json!(params.resolution.as_deref().unwrap_or(DEFAULT_RESOLUTION));
        } else {
            input["image_urls"] = json!([image_url]);
        }
        Ok(input)
    }
}

/// Classify a `recordInfo` response body.
pub fn classify_record(body: &str) -> PollObservation {
    let envelope = match Envelope::parse(body) {
        Ok(envelope) => envelope,
        Err(e) => return PollObservation::Unclassified(format!("malformed status response: {}", e)),
    };
    if !envelope.is_ok() {
        return PollObservation::Unclassified(format!(
            "status code {}: {}",
            envelope.code,
            envelope.message().unwrap_or("no message")
        ));
    }
    let Some(data) = envelope.data.as_ref() else {
        return PollObservation::Unclassified("status response has no data".into());
    };

    match data.get("state").and_then(Value::as_str) {
        Some("success") => PollObservation::Succeeded(result_urls(data)),
        Some("fail") => PollObservation::Failed(
            data.get("failMsg")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or("generation failed")
                .to_string(),
        ),
        Some("waiting") | Some("queuing") | Some("generating") => PollObservation::Running,
        Some(other) => PollObservation::Unclassified(format!("unknown state '{}'", other)),
        None => PollObservation::Unclassified("status response has no state".into()),
    }
}

/// `resultJson` is a JSON document encoded as a string.
fn result_urls(data: &Value) -> Vec<String> {
    data.get("resultJson")
        .and_then(Value::as_str)
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
        .and_then(|parsed| parsed.get("resultUrls").and_then(http::url_list))
        .unwrap_or_default()
}

#[async_trait]
impl GenerationBackend for JobsClient {
    fn name(&self) -> &'static str {
        "jobs"
    }

    fn payload(
        &self,
        kind: JobKind,
        params: &GenerationParams,
    ) -> Result<Value, SubmissionError> {
        if params.origin_task_id.is_some() {
            return Err(SubmissionError::Unsupported(
                "the jobs API cannot extend an existing task".into(),
            ));
        }
        let (model, input) = match kind {
            JobKind::Image => {
                let model = params.model.as_deref().unwrap_or(&self.image_model);
                (model, Self::image_input(params))
            }
            JobKind::Video => {
                let model = params.model.as_deref().unwrap_or(&self.video_model);
                (model, Self::video_input(model, params)?)
            }
        };
        Ok(json!({ "model": model, "input": input }))
    }

    async fn submit(
        &self,
        kind: JobKind,
        params: &GenerationParams,
    ) -> Result<String, SubmissionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SubmissionError::MissingApiKey(self.api_key_env.clone()))?;
        let payload = self.payload(kind, params)?;
        info!(kind = %kind, model = %payload["model"], "Creating generation task");

        let url = format!("{}/createTask", self.base_url);
        let body = http::post_json(&self.http, &url, api_key, &payload).await?;
        let task_id = http::parse_task_id(&body)?;
        info!(task_id = %task_id, "Task created");
        Ok(task_id)
    }

    async fn status(&self, task_id: &str) -> Result<PollObservation, PollError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PollError::MissingApiKey(self.api_key_env.clone()))?;
        let url = format!("{}/recordInfo", self.base_url);
        let body = http::get_text(&self.http, &url, api_key, task_id).await?;
        let observation = classify_record(&body);
        debug!(task_id = %task_id, ?observation, "Status");
        Ok(observation)
    }
}
