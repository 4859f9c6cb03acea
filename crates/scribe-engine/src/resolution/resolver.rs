//! DOM Action Resolver
//!
//! Turns an [`ActionIntent`] into a live element by trying its lookup
//! strategies strictly in declared order. The resolver never decides what a
//! missing element means; callers apply their own policy to the error.

use super::result::ResolutionError;
use crate::backend::Backend;
use scribe_common::intent::definition::ActionIntent;
use scribe_common::protocol::ElementHandle;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub struct ActionResolver;

impl ActionResolver {
    /// One pass over the intent's strategies. The first visible match wins.
    ///
    /// A backend error while evaluating a strategy counts as a miss for that
    /// strategy; lookups are retried by callers, not here.
    pub async fn resolve<B: Backend + ?Sized>(
        backend: &mut B,
        intent: &ActionIntent,
    ) -> Result<ElementHandle, ResolutionError> {
        let mut error = ResolutionError::new(&intent.name);

        for strategy in &intent.strategies {
            match backend.query(strategy).await {
                Ok(Some(handle)) => {
                    debug!(intent = %intent.name, strategy = %strategy, id = handle.id, "resolved");
                    return Ok(handle);
                }
                Ok(None) => error.attempted.push(format!("{} (no match)", strategy)),
                Err(e) => {
                    debug!(intent = %intent.name, strategy = %strategy, "lookup error: {}", e);
                    error.attempted.push(format!("{} (error: {})", strategy, e));
                }
            }
        }

        Err(error)
    }

    /// Repeat [`resolve`](Self::resolve) until it succeeds or `timeout` elapses.
    /// At least one pass is always made.
    pub async fn resolve_within<B: Backend + ?Sized>(
        backend: &mut B,
        intent: &ActionIntent,
        timeout: Duration,
        interval: Duration,
    ) -> Result<ElementHandle, ResolutionError> {
        let deadline = Instant::now() + timeout;
        loop {
            match Self::resolve(backend, intent).await {
                Ok(handle) => return Ok(handle),
                Err(e) if Instant::now() + interval >= deadline => return Err(e),
                Err(_) => tokio::time::sleep(interval).await,
            }
        }
    }

    /// Up to `attempts` passes separated by `delay`.
    pub async fn resolve_with_retries<B: Backend + ?Sized>(
        backend: &mut B,
        intent: &ActionIntent,
        attempts: u32,
        delay: Duration,
    ) -> Result<ElementHandle, ResolutionError> {
        let attempts = attempts.max(1);
        let mut last = ResolutionError::new(&intent.name);
        for attempt in 1..=attempts {
            match Self::resolve(backend, intent).await {
                Ok(handle) => return Ok(handle),
                Err(e) => {
                    debug!(intent = %intent.name, attempt, attempts, "not resolved yet");
                    last = e;
                }
            }
            if attempt < attempts {
                tokio::time::sleep(delay).await;
            }
        }
        Err(last)
    }

    /// Whether any strategy currently matches.
    pub async fn is_present<B: Backend + ?Sized>(backend: &mut B, intent: &ActionIntent) -> bool {
        Self::resolve(backend, intent).await.is_ok()
    }
}
