//! Adaptive upload window for big-pool writes.

use std::time::Duration;

/// Bounds and target rate of an [`AdaptiveWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// Smallest chunk size.
    pub min: usize,
    /// Largest chunk size.
    pub max: usize,
    /// Expected backend throughput in bytes per second.
    pub expected_rate: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            min: 512 * 1024,
            max: 8 * 1024 * 1024,
            expected_rate: 64 * 1024 * 1024,
        }
    }
}

/// Chunk size that follows observed backend latency.
///
/// Three consecutive chunks slower than twice the expected time halve the
/// window; one chunk faster than expected doubles it.
#[derive(Debug, Clone)]
pub struct AdaptiveWindow {
    config: WindowConfig,
    current: usize,
    slow_streak: u32,
}

/// Consecutive slow chunks that shrink the window.
const SLOW_CHUNKS_BEFORE_SHRINK: u32 = 3;

impl AdaptiveWindow {
    /// Start at the minimum window.
    #[must_use]
    pub fn new(config: WindowConfig) -> Self {
        let min = config.min.max(1);
        let config = WindowConfig {
            min,
            max: config.max.max(min),
            expected_rate: config.expected_rate.max(1),
        };
        Self {
            current: min,
            config,
            slow_streak: 0,
        }
    }

    /// Current chunk size.
    #[must_use]
    pub fn size(&self) -> usize {
        self.current
    }

    /// Time a chunk of `bytes` should take at the expected rate.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn expected_duration(&self, bytes: u64) -> Duration {
        Duration::from_secs_f64(bytes as f64 / self.config.expected_rate as f64)
    }

    /// Feed the completion time of one chunk.
    pub fn observe(&mut self, bytes: u64, elapsed: Duration) {
        let expected = self.expected_duration(bytes);
        if elapsed > expected * 2 {
            self.slow_streak += 1;
            if self.slow_streak >= SLOW_CHUNKS_BEFORE_SHRINK {
                self.current = (self.current / 2).max(self.config.min);
                self.slow_streak = 0;
            }
            return;
        }
        self.slow_streak = 0;
        if elapsed < expected {
            self.current = self.current.saturating_mul(2).min(self.config.max);
        }
    }
}
