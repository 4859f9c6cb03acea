//! Client for the Veo video API (`/generate`, `/record-info`).

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

const DEFAULT_ASPECT: &str = "16:9";

pub struct VeoClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    api_key_env: String,
    model: String,
}

impl VeoClient {
    pub fn from_config(
        config: &GenerationConfig,
        api_key: Option<String>,
    ) -> Result<Self, SubmissionError> {
        Ok(Self {
            http: http::build_client(Duration::from_millis(config.request_timeout_ms))?,
            base_url: config.veo_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            api_key_env: config.api_key_env.clone(),
            model: config.veo_model.clone(),
        })
    }
}

/// Classify a `record-info` response body. `successFlag`: 0 running,
/// 1 success, 2 and 3 failed.
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

    match data.get("successFlag").and_then(Value::as_i64) {
        Some(0) => PollObservation::Running,
        Some(1) => PollObservation::Succeeded(result_urls(data)),
        Some(2) | Some(3) => PollObservation::Failed(
            data.get("errorMessage")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .or(envelope.message())
                .unwrap_or("generation failed")
                .to_string(),
        ),
        Some(flag) => PollObservation::Unclassified(format!("unknown successFlag {}", flag)),
        None => PollObservation::Unclassified("status response has no successFlag".into()),
    }
}

/// The result list moves around between API revisions.
fn result_urls(data: &Value) -> Vec<String> {
    [
        data.get("resultUrls"),
        data.get("info").and_then(|i| i.get("resultUrls")),
        data.get("response").and_then(|r| r.get("resultUrls")),
    ]
    .into_iter()
    .flatten()
    .find_map(http::url_list)
    .unwrap_or_default()
}

#[async_trait]
impl GenerationBackend for VeoClient {
    fn name(&self) -> &'static str {
        "veo"
    }

    fn payload(
        &self,
        kind: JobKind,
        params: &GenerationParams,
    ) -> Result<Value, SubmissionError> {
        if kind != JobKind::Video {
            return Err(SubmissionError::Unsupported(
                "the Veo API only generates video".into(),
            ));
        }
        let model = params.model.as_deref().unwrap_or(&self.model);

        if let Some(origin) = &params.origin_task_id {
            return Ok(json!({
                "prompt": params.prompt,
                "model": model,
                "originTaskId": origin,
            }));
        }

        let mut payload = json!({
            "prompt": params.prompt,
            "model": model,
            "aspectRatio": params.aspect_ratio.as_deref().unwrap_or(DEFAULT_ASPECT),
        });
        if let Some(url) = &params.image_url {
            payload["imageUrls"] = json!([url]);
        }
        Ok(payload)
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
        match &params.origin_task_id {
            Some(origin) => info!(origin = %origin, "Creating Veo extension task"),
            None if params.image_url.is_some() => info!("Creating Veo image-to-video task"),
            None => info!("Creating Veo text-to-video task"),
        }

        let url = format!("{}/generate", self.base_url);
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
        let url = format!("{}/record-info", self.base_url);
        let body = http::get_text(&self.http, &url, api_key, task_id).await?;
        let observation = classify_record(&body);
        debug!(task_id = %task_id, ?observation, "Status");
        Ok(observation)
    }
}
