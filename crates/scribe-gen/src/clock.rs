use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Time source for the poller. Swapped out in tests so loops run without
/// waiting.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);

    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[async_trait]
impl<C: Clock + ?Sized> Clock for &C {
    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }

    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
