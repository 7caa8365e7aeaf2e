//! Gateway-side rate limiting.
//!
//! Two independent budgets apply on the gateway: identify operations are
//! limited fleet-wide (`max_concurrency` identifies per 5 seconds), and each
//! connection may send at most 120 commands per 60 seconds, heartbeats
//! excluded.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{sleep, sleep_until, Instant};

/// Rate limiter for Gateway identify operations.
///
/// Discord allows `max_concurrency` identify operations every 5 seconds.
/// All shards of a fleet share one instance so their identifies serialize
/// through it.
pub struct IdentifyRateLimiter {
    /// Semaphore with max_concurrency permits.
    semaphore: Arc<Semaphore>,

    /// Duration to hold the permit (5 seconds per Discord docs).
    hold_duration: Duration,
}

impl IdentifyRateLimiter {
    /// Create a new identify rate limiter.
    ///
    /// # Arguments
    /// * `max_concurrency` - Maximum concurrent identifies (from /gateway/bot).
    #[must_use]
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
            hold_duration: Duration::from_secs(5),
        }
    }

    /// Acquire permission to send an Identify payload.
    ///
    /// Blocks until a slot is available. The slot is released 5 seconds
    /// later, which gives consecutive identifies the spacing the server
    /// enforces.
    ///
    /// # Errors
    /// Returns `GatewayError::ChannelSend` if the semaphore is closed.
    pub async fn acquire(&self) -> Result<(), crate::GatewayError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| crate::GatewayError::ChannelSend("identify gate closed".to_string()))?;

        let hold_duration = self.hold_duration;
        tokio::spawn(async move {
            sleep(hold_duration).await;
            drop(permit);
        });

        Ok(())
    }

    /// Number of identify slots currently available.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Default for IdentifyRateLimiter {
    fn default() -> Self {
        // Default max_concurrency is 1 for most bots
        Self::new(1)
    }
}

/// Window over which gateway commands are counted.
const COMMAND_WINDOW: Duration = Duration::from_secs(60);

/// Commands allowed per window.
const COMMANDS_PER_WINDOW: u32 = 120;

/// Rate limiter for outbound gateway commands.
///
/// Presence updates, voice state updates, member requests, and raw sends
/// all pass through here. Heartbeats are exempt: the shard loop sends
/// them directly, and they neither consume nor shrink the budget.
#[derive(Debug, Default)]
pub struct CommandRatelimiter {
    sent: Mutex<VecDeque<Instant>>,
}

impl CommandRatelimiter {
    /// Create a limiter for one connection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands still available in the current window.
    pub fn available(&self) -> u32 {
        let mut sent = self.sent.lock();
        Self::evict(&mut sent);
        COMMANDS_PER_WINDOW - sent.len() as u32
    }

    /// Maximum commands per window.
    pub fn max(&self) -> u32 {
        COMMANDS_PER_WINDOW
    }

    /// Take one command token, waiting for the window to roll if exhausted.
    pub async fn acquire(&self) {
        loop {
            let wait_until = {
                let mut sent = self.sent.lock();
                Self::evict(&mut sent);

                if (sent.len() as u32) < COMMANDS_PER_WINDOW {
                    sent.push_back(Instant::now());
                    return;
                }

                // Front is the oldest send still inside the window.
                match sent.front() {
                    Some(oldest) => *oldest + COMMAND_WINDOW,
                    None => return,
                }
            };

            sleep_until(wait_until).await;
        }
    }

    fn evict(sent: &mut VecDeque<Instant>) {
        let now = Instant::now();
        while let Some(front) = sent.front() {
            if now.duration_since(*front) >= COMMAND_WINDOW {
                sent.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Calculate backoff duration with exponential increase.
///
/// # Arguments
/// * `attempt` - Current attempt number (0-indexed).
/// * `base_ms` - Base delay in milliseconds.
/// * `max_ms` - Maximum delay in milliseconds.
pub fn exponential_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay_ms.min(max_ms))
}

/// Add random jitter to a duration.
///
/// # Arguments
/// * `duration` - Base duration.
/// * `jitter_factor` - Factor of jitter (0.0 = no jitter, 1.0 = up to 100%).
pub fn with_jitter(duration: Duration, jitter_factor: f64) -> Duration {
    use rand::Rng;

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jitter_range = (duration.as_millis() as f64 * jitter_factor) as u64;
    let jitter = rand::rng().random_range(0..=jitter_range);
    duration + Duration::from_millis(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_backoff_doubles_and_caps() {
        assert_eq!(
            exponential_backoff(0, 1000, 30000),
            Duration::from_millis(1000)
        );
        assert_eq!(
            exponential_backoff(1, 1000, 30000),
            Duration::from_millis(2000)
        );
        assert_eq!(
            exponential_backoff(3, 1000, 30000),
            Duration::from_millis(8000)
        );
        assert_eq!(
            exponential_backoff(10, 1000, 30000),
            Duration::from_millis(30000)
        );
    }

    #[tokio::test]
    async fn rate_limiter_permits() {
        let limiter = IdentifyRateLimiter::new(3);
        assert_eq!(limiter.available_permits(), 3);

        limiter.acquire().await.unwrap();
        assert!(limiter.available_permits() <= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn command_budget_blocks_until_window_rolls() {
        let limiter = CommandRatelimiter::new();
        assert_eq!(limiter.max(), 120);

        for _ in 0..limiter.max() {
            limiter.acquire().await;
        }
        assert_eq!(limiter.available(), 0);

        // The next acquire must wait for the window to roll over.
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= COMMAND_WINDOW);
    }
}
