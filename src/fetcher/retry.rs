use crate::model::FetchError;

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Bounded retry for transient request failures.
///
/// Attempt `n` (1-based) that fails transiently is followed by a sleep of
/// `backoff * 2^(n-1)` plus up to 25% random jitter. Non-transient errors
/// (most 4xx, bad payloads) are returned immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// One attempt, no retry.
    pub fn single() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let wait = self.delay_for(attempt);
                    warn!(
                        "⏳ {} failed (attempt {}/{}): {}; retrying in {:?}",
                        what, attempt, self.max_attempts, e, wait
                    );
                    sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Runs `op` against each fallback parameter in order until one succeeds.
    ///
    /// Every parameter gets the full attempt budget of this policy. Any error,
    /// transient or not, moves on to the next parameter after `between`.
    pub async fn run_with_fallbacks<P, T, F, Fut>(
        &self,
        what: &str,
        params: &[P],
        between: Duration,
        mut op: F,
    ) -> Result<T, FetchError>
    where
        P: Clone + std::fmt::Display,
        F: FnMut(P) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut last_err = FetchError::Payload("no fallback parameters".into());
        for (idx, param) in params.iter().enumerate() {
            if idx > 0 {
                sleep(between).await;
            }
            match self.run(what, || op(param.clone())).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!("⚠️ {} for {} failed: {}", what, param, e);
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.backoff.saturating_mul(1 << (attempt - 1).min(16));
        base + jitter(base / 4)
    }
}

fn jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}
