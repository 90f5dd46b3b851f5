use std::time::Duration;

/// Delay schedule applied between reads that found no data.
///
/// A fixed schedule (`base == max`) is what the capture consumer uses:
/// the delay is coarser than the frame interval so empty reads are visible
/// without spinning. An exponential schedule doubles from `base` up to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Delay after the first empty read
    pub base: Duration,
    /// Upper bound for the delay
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::fixed(Duration::from_millis(30))
    }
}

impl Backoff {
    pub fn fixed(delay: Duration) -> Self {
        Self {
            base: delay,
            max: delay,
        }
    }

    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
        }
    }

    /// Delay before the next read, given how many consecutive empty reads preceded it.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}
