use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use scribe_gen::{
    Clock, GenerationBackend, GenerationParams, JobError, JobKind, JobPoller, PollError,
    PollObservation, PollPolicy, SubmissionError,
};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Replays scripted status responses; the last one repeats forever.
struct ScriptedBackend {
    submit: Mutex<Option<Result<String, SubmissionError>>>,
    script: Mutex<VecDeque<Result<PollObservation, PollError>>>,
    calls: Mutex<u32>,
}

impl ScriptedBackend {
    fn new(script: Vec<Result<PollObservation, PollError>>) -> Self {
        Self {
            submit: Mutex::new(Some(Ok("task-1".into()))),
            script: Mutex::new(script.into()),
            calls: Mutex::new(0),
        }
    }

    fn failing_submit(error: SubmissionError) -> Self {
        let backend = Self::new(vec![]);
        *backend.submit.lock().unwrap() = Some(Err(error));
        backend
    }

    fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn payload(&self, _kind: JobKind, params: &GenerationParams) -> Result<Value, SubmissionError> {
        Ok(json!({ "prompt": params.prompt }))
    }

    async fn submit(
        &self,
        _kind: JobKind,
        _params: &GenerationParams,
    ) -> Result<String, SubmissionError> {
        self.submit
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(SubmissionError::Http("submitted twice".into())))
    }

    async fn status(&self, _task_id: &str) -> Result<PollObservation, PollError> {
        *self.calls.lock().unwrap() += 1;
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            match script.front() {
                Some(Ok(o)) => Ok(o.clone()),
                Some(Err(_)) => Err(PollError::Http("connection reset".into())),
                None => Ok(PollObservation::Running),
            }
        }
    }
}

/// Records requested sleeps and returns immediately.
#[derive(Default)]
struct RecordingClock {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingClock {
    fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }

    fn now(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    }
}

fn image_policy() -> PollPolicy {
    JobKind::Image.default_policy()
}

#[tokio::test]
async fn test_three_running_then_success_returns_url() {
    let backend = ScriptedBackend::new(vec![
        Ok(PollObservation::Running),
        Ok(PollObservation::Running),
        Ok(PollObservation::Running),
        Ok(PollObservation::Succeeded(vec!["http://x/img.png".into()])),
    ]);
    let poller = JobPoller::with_clock(backend, RecordingClock::default());

    let url = poller.poll("task-1", image_policy()).await.unwrap();

    assert_eq!(url, "http://x/img.png");
    assert_eq!(poller.backend().calls(), 4);
}

#[tokio::test]
async fn test_sleeps_before_every_check() {
    let clock = RecordingClock::default();
    let backend = ScriptedBackend::new(vec![
        Ok(PollObservation::Running),
        Ok(PollObservation::Succeeded(vec!["http://x/v.mp4".into()])),
    ]);
    let poller = JobPoller::with_clock(backend, &clock);

    poller
        .poll("task-1", PollPolicy::new(Duration::from_secs(10), 60))
        .await
        .unwrap();

    assert_eq!(clock.sleeps(), vec![Duration::from_secs(10); 2]);
}

#[tokio::test]
async fn test_still_running_at_last_attempt_is_timeout() {
    let clock = RecordingClock::default();
    let poller = JobPoller::with_clock(
        ScriptedBackend::new(vec![Ok(PollObservation::Running)]),
        &clock,
    );

    let err = poller.poll("task-1", image_policy()).await.unwrap_err();

    match err {
        JobError::Timeout { task_id, attempts } => {
            assert_eq!(task_id, "task-1");
            assert_eq!(attempts, 120);
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(poller.backend().calls(), 120);
    assert_eq!(clock.sleeps().len(), 120);
}

#[tokio::test]
async fn test_flaky_polls_are_counted_but_do_not_abort() {
    let poller = JobPoller::with_clock(
        ScriptedBackend::new(vec![
            Err(PollError::Http("connection reset".into())),
            Ok(PollObservation::Unclassified("unknown state".into())),
            Err(PollError::Status {
                status: 502,
                body: "bad gateway".into(),
            }),
            Ok(PollObservation::Succeeded(vec!["http://x/img.png".into()])),
        ]),
        RecordingClock::default(),
    );

    let url = poller
        .poll("task-1", PollPolicy::new(Duration::from_secs(5), 4))
        .await
        .unwrap();
    assert_eq!(url, "http://x/img.png");
}

#[tokio::test]
async fn test_flaky_polls_exhaust_budget_as_timeout() {
    let poller = JobPoller::with_clock(
        ScriptedBackend::new(vec![Err(PollError::Http("connection reset".into()))]),
        RecordingClock::default(),
    );

    let err = poller
        .poll("task-1", PollPolicy::new(Duration::from_secs(5), 3))
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Timeout { attempts: 3, .. }));
}

#[tokio::test]
async fn test_remote_failure_is_generation_failed() {
    let poller = JobPoller::with_clock(
        ScriptedBackend::new(vec![
            Ok(PollObservation::Running),
            Ok(PollObservation::Failed("content policy".into())),
        ]),
        RecordingClock::default(),
    );

    match poller.poll("task-1", image_policy()).await.unwrap_err() {
        JobError::GenerationFailed { reason, .. } => assert_eq!(reason, "content policy"),
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(poller.backend().calls(), 2);
}

#[tokio::test]
async fn test_success_without_url_is_generation_failed() {
    let poller = JobPoller::with_clock(
        ScriptedBackend::new(vec![Ok(PollObservation::Succeeded(vec![]))]),
        RecordingClock::default(),
    );

    assert!(matches!(
        poller.poll("task-1", image_policy()).await,
        Err(JobError::GenerationFailed { .. })
    ));
}

#[tokio::test]
async fn test_submit_records_job_and_does_not_retry() {
    let poller = JobPoller::with_clock(
        ScriptedBackend::new(vec![]),
        RecordingClock::default(),
    );
    let job = poller
        .submit(JobKind::Video, GenerationParams::new("waves").duration_secs(5))
        .await
        .unwrap();
    assert_eq!(job.task_id(), "task-1");
    assert_eq!(job.kind(), JobKind::Video);
    assert_eq!(job.submitted_at(), Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap());
    assert_eq!(job.params().duration_secs, Some(5));

    let failing = JobPoller::with_clock(
        ScriptedBackend::failing_submit(SubmissionError::Rejected {
            code: 401,
            message: "invalid key".into(),
        }),
        RecordingClock::default(),
    );
    let err = failing
        .run(JobKind::Image, GenerationParams::new("x"), image_policy())
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Submission(SubmissionError::Rejected { code: 401, .. })));
    assert_eq!(failing.backend().calls(), 0);
}

#[tokio::test]
async fn test_independent_jobs_poll_concurrently() {
    let clock = RecordingClock::default();
    let poller = JobPoller::with_clock(
        ScriptedBackend::new(vec![
            Ok(PollObservation::Running),
            Ok(PollObservation::Succeeded(vec!["http://x/a.png".into()])),
        ]),
        &clock,
    );

    let (a, b) = tokio::join!(
        poller.poll("task-a", image_policy()),
        poller.poll("task-b", image_policy())
    );
    assert!(a.is_ok());
    assert!(b.is_ok());
}
