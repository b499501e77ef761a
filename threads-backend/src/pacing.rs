//! Clock abstraction used for every deliberate delay (container readiness,
//! batch pacing) so runs can be cancelled and tests never really sleep.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::errors::{BotError, BotResult};

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by tokio timers
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that never blocks: each sleep is recorded and advances `now`.
#[derive(Debug, Clone)]
pub struct RecordingClock {
    now: Arc<Mutex<DateTime<Utc>>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Default for RecordingClock {
    fn default() -> Self {
        Self::starting_at(Utc::now())
    }
}

#[async_trait]
impl Clock for RecordingClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|n| *n).unwrap_or_else(|_| Utc::now())
    }

    async fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
        if let Ok(mut now) = self.now.lock() {
            *now += chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
        }
    }
}

/// A clock paired with a cancellation token. Every pause and loop boundary
/// goes through here.
#[derive(Clone)]
pub struct Pacer {
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
}

impl Pacer {
    pub fn new(clock: Arc<dyn Clock>, cancel: CancellationToken) -> Self {
        Self { clock, cancel }
    }

    /// Real timers, never cancelled.
    pub fn wall_clock() -> Self {
        Self::new(Arc::new(TokioClock), CancellationToken::new())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Fails with `Cancelled` once the token has fired.
    pub fn checkpoint(&self) -> BotResult<()> {
        if self.cancel.is_cancelled() {
            Err(BotError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub async fn pause(&self, duration: Duration) -> BotResult<()> {
        self.checkpoint()?;
        if duration.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(BotError::Cancelled),
            _ = self.clock.sleep(duration) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_clock_advances_without_blocking() {
        let start = Utc::now();
        let clock = RecordingClock::starting_at(start);
        let pacer = Pacer::new(Arc::new(clock.clone()), CancellationToken::new());

        pacer.pause(Duration::from_secs(10)).await.unwrap();
        pacer.pause(Duration::from_secs(15)).await.unwrap();

        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(10), Duration::from_secs(15)]
        );
        assert_eq!(pacer.now() - start, chrono::Duration::seconds(25));
    }

    #[tokio::test]
    async fn cancelled_pacer_refuses_to_pause() {
        let clock = RecordingClock::default();
        let token = CancellationToken::new();
        let pacer = Pacer::new(Arc::new(clock.clone()), token.clone());

        token.cancel();
        let err = pacer.pause(Duration::from_secs(10)).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn cancel_interrupts_a_real_sleep() {
        let pacer = Pacer::wall_clock();
        let token = pacer.cancel_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let started = std::time::Instant::now();
        let result = pacer.pause(Duration::from_secs(30)).await;
        assert!(result.unwrap_err().is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
