//! Time source used by every retry, poll and timeout in the supervisor.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

/// Monotonic clock with an awaitable sleep.
///
/// Deadlines are always computed from [`Clock::now`] and waits always go
/// through [`Clock::sleep`], so a test double can advance virtual time
/// without real delays.
#[async_trait]
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

pub type SharedClock = Arc<dyn Clock>;

/// Clock backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub fn tokio_clock() -> SharedClock {
    Arc::new(TokioClock)
}
