//! Media generation jobs: submit to a remote generation API, then poll until
//! the job reaches a terminal state.

pub mod backend;
pub mod clock;
pub mod error;
mod http;
pub mod job;
pub mod kie;
pub mod poller;
pub mod status;
pub mod veo;

pub use backend::GenerationBackend;
pub use clock::{Clock, TokioClock};
pub use error::{JobError, PollError, SubmissionError};
pub use job::{GenerationJob, GenerationParams, JobKind, PollPolicy};
pub use kie::JobsClient;
pub use poller::JobPoller;
pub use status::{Effect, JobOutcome, Phase, PollObservation, PollTracker, Transition};
pub use veo::VeoClient;
