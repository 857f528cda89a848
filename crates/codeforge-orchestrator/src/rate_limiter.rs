//! Global pacing between LLM calls: before every call the Orchestrator
//! sleeps so the interval since the previous call is at least the
//! configured delay. The delay applies across all agents; the
//! Debugger's inner retry loop shares the same clock. Implements
//! [`codeforge_agents::Pacer`] so a single instance, handed to every
//! role's [`codeforge_agents::AgentContext`], is the one clock every
//! agent call measures itself against.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use codeforge_agents::Pacer;

use crate::cancellation::CancellationHandle;

pub const DEFAULT_REQUEST_DELAY_S: u64 = 6;

pub struct RateLimiter {
    enabled: bool,
    delay: Duration,
    last_call_end: Mutex<Option<Instant>>,
    cancellation: CancellationHandle,
}

impl RateLimiter {
    pub fn new(enabled: bool, delay: Duration, cancellation: CancellationHandle) -> Self {
        RateLimiter {
            enabled,
            delay,
            last_call_end: Mutex::new(None),
            cancellation,
        }
    }

    /// Sleeps, if necessary, so the gap since the previous call's start
    /// is at least `delay`. Returns `Err` if cancellation fires during
    /// the sleep.
    pub async fn wait(&self) -> Result<(), Cancelled> {
        if !self.enabled {
            return Ok(());
        }

        let sleep_for = {
            let mut last = self.last_call_end.lock().expect("rate limiter mutex poisoned");
            let now = Instant::now();
            let sleep_for = match *last {
                Some(previous) => self.delay.saturating_sub(now.duration_since(previous)),
                None => Duration::ZERO,
            };
            *last = Some(now + sleep_for);
            sleep_for
        };

        if sleep_for > Duration::ZERO {
            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = self.cancellation.cancelled() => {}
            }
        }

        if self.cancellation.is_cancelled() {
            return Err(Cancelled);
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Cancelled;

#[async_trait]
impl Pacer for RateLimiter {
    async fn pace(&self) -> Result<(), ()> {
        self.wait().await.map_err(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_limiter_never_sleeps() {
        let limiter = RateLimiter::new(false, Duration::from_secs(6), CancellationHandle::new());
        let started = Instant::now();
        limiter.wait().await.unwrap();
        limiter.wait().await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn enforces_minimum_gap_between_calls() {
        let limiter = RateLimiter::new(true, Duration::from_millis(80), CancellationHandle::new());
        let started = Instant::now();
        limiter.wait().await.unwrap();
        limiter.wait().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_sleep() {
        let cancellation = CancellationHandle::new();
        let limiter = RateLimiter::new(true, Duration::from_secs(30), cancellation.clone());
        limiter.wait().await.unwrap();

        let cancel_after = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancellation.cancel();
        });

        let started = Instant::now();
        let result = limiter.wait().await;
        cancel_after.await.unwrap();

        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(30));
    }
}
