use crate::error::{PollError, SubmissionError};
use crate::job::{GenerationParams, JobKind};
use crate::status::PollObservation;
use async_trait::async_trait;

/// A remote "submit, then poll" generation service.
///
/// Implementations hold no per-job state, so one backend can serve any number
/// of concurrent poll loops.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Request body that [`submit`](Self::submit) would send.
    fn payload(
        &self,
        kind: JobKind,
        params: &GenerationParams,
    ) -> Result<serde_json::Value, SubmissionError>;

    /// One job-creation request. Returns the task id.
    async fn submit(
        &self,
        kind: JobKind,
        params: &GenerationParams,
    ) -> Result<String, SubmissionError>;

    /// One status request, classified.
    async fn status(&self, task_id: &str) -> Result<PollObservation, PollError>;
}

#[async_trait]
impl<T: GenerationBackend + ?Sized> GenerationBackend for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn payload(
        &self,
        kind: JobKind,
        params: &GenerationParams,
    ) -> Result<serde_json::Value, SubmissionError> {
        (**self).payload(kind, params)
    }

    async fn submit(
        &self,
        kind: JobKind,
        params: &GenerationParams,
    ) -> Result<String, SubmissionError> {
        (**self).submit(kind, params).await
    }

    async fn status(&self, task_id: &str) -> Result<PollObservation, PollError> {
        (**self).status(task_id).await
    }
}
