use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry schedule shared by the embedding batcher and the answer
/// generator: linear backoff (`attempt * base_delay`) plus bounded
/// random jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            max_jitter: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Zero-delay policy for tests and offline providers.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay.saturating_mul(attempt);
        let jitter_ms = self.max_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return backoff;
        }
        backoff + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }

    /// Drives `operation` until it succeeds or the attempt budget is
    /// spent, sleeping `delay_for(attempt)` between attempts. The last
    /// error is returned on exhaustion.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    warn!(
                        label,
                        attempt,
                        max_attempts = attempts,
                        error = %error,
                        "attempt failed"
                    );
                    last_error = Some(error);
                    if attempt < attempts {
                        tokio::time::sleep(self.delay_for(attempt)).await;
                    }
                }
            }
        }

        // max_attempts >= 1, so at least one error was recorded.
        Err(last_error.expect("retry loop always records an error"))
    }
}
