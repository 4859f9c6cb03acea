//! Job Poller
//!
//! Drives one [`GenerationBackend`] through submit and poll. Each poll loop is
//! sequential sleep-then-check; the poller itself holds no per-job state, so
//! independent jobs can be polled concurrently from one instance.

use crate::backend::GenerationBackend;
use crate::clock::{Clock, TokioClock};
use crate::error::{JobError, PollError, SubmissionError};
use crate::job::{GenerationJob, GenerationParams, JobKind, PollPolicy};
use crate::status::{Effect, JobOutcome, Phase, PollObservation, PollTracker, Transition};
use tracing::{debug, error, info, warn};

pub struct JobPoller<B, C = TokioClock> {
    backend: B,
    clock: C,
}

impl<B: GenerationBackend> JobPoller<B, TokioClock> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            clock: TokioClock,
        }
    }
}

impl<B: GenerationBackend, C: Clock> JobPoller<B, C> {
    pub fn with_clock(backend: B, clock: C) -> Self {
        Self { backend, clock }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// One job-creation request. Failures are returned as is; nothing is
    /// resubmitted here.
    pub async fn submit(
        &self,
        kind: JobKind,
        params: GenerationParams,
    ) -> Result<GenerationJob, SubmissionError> {
        let task_id = self.backend.submit(kind, &params).await.map_err(|e| {
            error!(backend = self.backend.name(), kind = %kind, "Submission failed: {}", e);
            e
        })?;
        Ok(GenerationJob::new(task_id, self.clock.now(), kind, params))
    }

    /// Poll until the job is terminal. Returns the first result URL.
    pub async fn poll(&self, task_id: &str, policy: PollPolicy) -> Result<String, JobError> {
        info!(
            backend = self.backend.name(),
            task_id = %task_id,
            interval_ms = policy.interval.as_millis() as u64,
            max_attempts = policy.max_attempts,
            "Polling task"
        );

        let mut tracker = PollTracker::new(policy);
        let mut transition = tracker.start();
        loop {
            self.perform(task_id, &transition).await;
            if let Phase::Finished(outcome) = transition.phase {
                return self.finish(task_id, outcome);
            }
            let observation = self.observe(task_id).await;
            debug!(task_id = %task_id, attempt = tracker.attempts() + 1, ?observation, "Observed");
            transition = tracker.advance(observation);
        }
    }

    /// Submit, then poll with `policy`.
    pub async fn run(
        &self,
        kind: JobKind,
        params: GenerationParams,
        policy: PollPolicy,
    ) -> Result<(GenerationJob, String), JobError> {
        let job = self.submit(kind, params).await?;
        let url = self.poll(job.task_id(), policy).await?;
        Ok((job, url))
    }

    /// A single status request without waiting.
    pub async fn check(&self, task_id: &str) -> Result<PollObservation, PollError> {
        self.backend.status(task_id).await
    }

    async fn observe(&self, task_id: &str) -> PollObservation {
        match self.backend.status(task_id).await {
            Ok(observation) => observation,
            Err(e) => PollObservation::Unclassified(e.to_string()),
        }
    }

    async fn perform(&self, task_id: &str, transition: &Transition) {
        for effect in &transition.effects {
            match effect {
                Effect::Warn(message) => warn!(task_id = %task_id, "Unclassified status: {}", message),
                Effect::Sleep(duration) => self.clock.sleep(*duration).await,
            }
        }
    }

    fn finish(&self, task_id: &str, outcome: JobOutcome) -> Result<String, JobError> {
        match outcome {
            JobOutcome::Succeeded(url) => {
                info!(task_id = %task_id, url = %url, "Task succeeded");
                Ok(url)
            }
            JobOutcome::Failed(reason) => {
                error!(task_id = %task_id, "Task failed: {}", reason);
                Err(JobError::GenerationFailed {
                    task_id: task_id.to_string(),
                    reason,
                })
            }
            JobOutcome::TimedOut { attempts } => {
                error!(task_id = %task_id, attempts, "Timed out waiting for task");
                Err(JobError::Timeout {
                    task_id: task_id.to_string(),
                    attempts,
                })
            }
        }
    }
}
