use std::time::Duration;

/// Delay between failed connect attempts when nothing else is configured
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(10);

/// Trait for pacing connect attempts against an unreachable hub
///
/// The supervisor consults the strategy only after a failed handshake. A read
/// loop that ends on a live session reconnects right away, and a successful
/// handshake restarts the attempt count at zero.
pub trait ReconnectionStrategy: Send + Sync {
    /// Delay before the next connect attempt
    ///
    /// # Arguments
    /// * `attempt` - Number of consecutive failed attempts so far (0-indexed)
    ///
    /// # Returns
    /// * `Some(duration)` - Sleep this long, then try again
    /// * `None` - Give up; the supervisor stops
    fn next_delay(&self, attempt: usize) -> Option<Duration>;
}

fn within_limit(max_attempts: Option<usize>, attempt: usize) -> bool {
    max_attempts.map_or(true, |max| attempt < max)
}

/// Same delay before every attempt
///
/// `FixedDelay::default()` retries forever every 10 seconds.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<usize>,
}

impl FixedDelay {
    /// # Arguments
    /// * `delay` - Wait between attempts
    /// * `max_attempts` - Give up after this many failures (None = never)
    pub fn new(delay: Duration, max_attempts: Option<usize>) -> Self {
        Self { delay, max_attempts }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_DELAY, None)
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        within_limit(self.max_attempts, attempt).then_some(self.delay)
    }
}

/// Doubling delay: `initial_delay * 2^attempt`, capped at `max_delay`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<usize>,
}

impl ExponentialBackoff {
    pub fn new(initial_delay: Duration, max_delay: Duration, max_attempts: Option<usize>) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_attempts,
        }
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !within_limit(self.max_attempts, attempt) {
            return None;
        }

        let factor = u32::try_from(attempt)
            .ok()
            .and_then(|exp| 2u32.checked_pow(exp))
            .unwrap_or(u32::MAX);
        let delay = self
            .initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay);
        Some(delay.min(self.max_delay))
    }
}

/// Give up after the first failed handshake
#[derive(Debug, Clone, Default)]
pub struct NeverReconnect;

impl ReconnectionStrategy for NeverReconnect {
    fn next_delay(&self, _attempt: usize) -> Option<Duration> {
        None
    }
}
