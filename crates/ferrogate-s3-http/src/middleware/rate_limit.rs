//! Concurrency limiter; excess requests are answered `503 SlowDown`.

use std::sync::Arc;

use ferrogate_s3_model::error::{S3Error, S3ErrorCode};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounds the number of requests in flight.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    permits: Arc<Semaphore>,
}

impl RateLimiter {
    /// Allow up to `max_concurrent` requests at once; `0` means unbounded.
    #[must_use]
    pub fn new(max_concurrent: usize) -> Self {
        let permits = if max_concurrent == 0 {
            Semaphore::MAX_PERMITS
        } else {
            max_concurrent.min(Semaphore::MAX_PERMITS)
        };
        Self {
            permits: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Take a slot for one request. The slot frees when the permit drops.
    ///
    /// # Errors
    ///
    /// `SlowDown` when every slot is taken.
    pub fn try_acquire(&self) -> Result<OwnedSemaphorePermit, S3Error> {
        Arc::clone(&self.permits)
            .try_acquire_owned()
            .map_err(|_| S3Error::new(S3ErrorCode::SlowDown))
    }

    /// Free slots right now.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
