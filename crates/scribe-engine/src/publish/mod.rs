//! Publish State Machine
//!
//! Drives the web editor from session restore to publish confirmation. Every
//! UI interaction goes through the [`ActionResolver`](crate::resolution::ActionResolver);
//! whether a missing element aborts the run is decided per state by
//! [`PublishState::policy`].

pub mod diagnostics;
pub mod error;
pub mod machine;
pub mod request;
pub mod state;
mod steps;

pub use diagnostics::{DiagnosticBundle, DiagnosticsWriter};
pub use error::PublishError;
pub use machine::{Credentials, Publisher, PublisherSettings, SessionCheck, classify_location};
pub use request::{PublishOutcome, PublishRequest, PublishStatus};
pub use state::{FailurePolicy, PublishState, RunFacts};
