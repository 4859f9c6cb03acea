//! Poll loop as a pure transition function.
//!
//! [`PollTracker`] never sleeps and never talks to the network. It consumes
//! one observation at a time and returns the next phase plus the side effects
//! the driver must perform, which keeps the attempt accounting testable
//! without a clock.

use crate::job::PollPolicy;
use std::time::Duration;

/// What one status request said about a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollObservation {
    Running,
    Succeeded(Vec<String>),
    Failed(String),
    /// The response could not be classified (network error, bad envelope,
    /// unknown state). Counts as an attempt, never ends the loop early.
    Unclassified(String),
}

/// Terminal result of a poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded(String),
    Failed(String),
    TimedOut { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Perform the effects, then check the status again.
    Check,
    Finished(JobOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Sleep(Duration),
    Warn(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub phase: Phase,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn check_after(interval: Duration) -> Self {
        Self {
            phase: Phase::Check,
            effects: vec![Effect::Sleep(interval)],
        }
    }

    fn finished(outcome: JobOutcome) -> Self {
        Self {
            phase: Phase::Finished(outcome),
            effects: Vec::new(),
        }
    }
}

/// Attempt accounting for one job. Sleep-then-check: every check is preceded
/// by one interval.
#[derive(Debug, Clone)]
pub struct PollTracker {
    policy: PollPolicy,
    attempts: u32,
}

impl PollTracker {
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// First transition of the loop.
    pub fn start(&self) -> Transition {
        if self.policy.max_attempts == 0 {
            return Transition::finished(JobOutcome::TimedOut { attempts: 0 });
        }
        Transition::check_after(self.policy.interval)
    }

    pub fn advance(&mut self, observation: PollObservation) -> Transition {
        self.attempts += 1;

        let mut effects = Vec::new();
        match observation {
            PollObservation::Succeeded(urls) => {
                return match urls.into_iter().find(|u| !u.trim().is_empty()) {
                    Some(url) => Transition::finished(JobOutcome::Succeeded(url)),
                    None => Transition::finished(JobOutcome::Failed(
                        "service reported success without a result URL".into(),
                    )),
                };
            }
            PollObservation::Failed(reason) => {
                return Transition::finished(JobOutcome::Failed(reason));
            }
            PollObservation::Running => {}
            PollObservation::Unclassified(detail) => {
                effects.push(Effect::Warn(format!(
                    "attempt {}/{}: {}",
                    self.attempts, self.policy.max_attempts, detail
                )));
            }
        }

        if self.attempts >= self.policy.max_attempts {
            let mut transition = Transition::finished(JobOutcome::TimedOut {
                attempts: self.attempts,
            });
            transition.effects = effects;
            return transition;
        }

        effects.push(Effect::Sleep(self.policy.interval));
        Transition {
            phase: Phase::Check,
            effects,
        }
    }
}
