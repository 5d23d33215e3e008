//! Politeness pacing between processed items
//!
//! The frontier and the enrichment pipeline are single-worker loops that
//! pause after every item they process. The pause lives behind `Pacer` so
//! the loops stay independent of real timers.

use async_trait::async_trait;
use std::time::Duration;

/// Waits between two consecutive items of a sequential loop
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Called once after every processed item, success or failure
    async fn pause(&self);
}

/// Sleeps for a fixed interval on the tokio timer
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl Pacer for FixedDelay {
    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Never waits
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Pacer for NoDelay {
    async fn pause(&self) {}
}
