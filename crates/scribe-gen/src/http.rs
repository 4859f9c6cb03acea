//! Transport shared by the generation clients. Both APIs wrap every response
//! in `{code, msg|message, data}`.

use crate::error::{PollError, SubmissionError, map_http_error};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn build_client(timeout: Duration) -> Result<Client, SubmissionError> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(timeout)
        .build()
        .map_err(|e| SubmissionError::Http(format!("failed to create HTTP client: {}", e)))
}

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Envelope {
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    pub fn is_ok(&self) -> bool {
        self.code == 200
    }

    pub fn message(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .or(self.message.as_deref())
            .filter(|m| !m.is_empty())
    }
}

/// Task id from a job-creation response.
pub(crate) fn parse_task_id(body: &str) -> Result<String, SubmissionError> {
    let envelope = Envelope::parse(body).map_err(|e| SubmissionError::Malformed(e.to_string()))?;
    if !envelope.is_ok() {
        return Err(SubmissionError::Rejected {
            code: envelope.code,
            message: envelope.message().unwrap_or("no message").to_string(),
        });
    }
    envelope
        .data
        .as_ref()
        .and_then(|d| d.get("taskId"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SubmissionError::Malformed("response has no data.taskId".into()))
}

/// Result URLs given either as an array or as a JSON-encoded array string.
pub(crate) fn url_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        Value::String(encoded) => serde_json::from_str::<Vec<String>>(encoded).ok(),
        _ => None,
    }
}

pub(crate) async fn post_json(
    client: &Client,
    url: &str,
    api_key: &str,
    payload: &Value,
) -> Result<String, SubmissionError> {
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(payload)
        .send()
        .await
        .map_err(|e| SubmissionError::Http(map_http_error(&e)))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| SubmissionError::Http(map_http_error(&e)))?;
    if !status.is_success() {
        return Err(SubmissionError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

pub(crate) async fn get_text(
    client: &Client,
    url: &str,
    api_key: &str,
    task_id: &str,
) -> Result<String, PollError> {
    let response = client
        .get(url)
        .bearer_auth(api_key)
        .query(&[("taskId", task_id)])
        .send()
        .await
        .map_err(|e| PollError::Http(map_http_error(&e)))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| PollError::Http(map_http_error(&e)))?;
    if !status.is_success() {
        return Err(PollError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_id_requires_code_200() {
        assert_eq!(
            parse_task_id(r#"{"code":200,"msg":"success","data":{"taskId":"t-1"}}"#).unwrap(),
            "t-1"
        );
        match parse_task_id(r#"{"code":402,"message":"Insufficient credits"}"#) {
            Err(SubmissionError::Rejected { code, message }) => {
                assert_eq!(code, 402);
                assert_eq!(message, "Insufficient credits");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_task_id_missing_or_body_not_json_is_malformed() {
        assert!(matches!(
            parse_task_id(r#"{"code":200,"data":{}}"#),
            Err(SubmissionError::Malformed(_))
        ));
        assert!(matches!(
            parse_task_id("<html>Bad Gateway</html>"),
            Err(SubmissionError::Malformed(_))
        ));
    }

    #[test]
    fn test_url_list_accepts_encoded_string() {
        assert_eq!(
            url_list(&json!("[\"http://x/a.mp4\"]")),
            Some(vec!["http://x/a.mp4".to_string()])
        );
        assert_eq!(
            url_list(&json!(["http://x/a.mp4"])),
            Some(vec!["http://x/a.mp4".to_string()])
        );
        assert_eq!(url_list(&json!(42)), None);
    }
}
