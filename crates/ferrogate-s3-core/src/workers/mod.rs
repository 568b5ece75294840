//! Long-lived background workers fed through bounded channels.
//!
//! Both workers stop in two phases: [`Recycler::stop`] / [`MetaSync::stop`]
//! refuse new work, then the task drains what is already queued and exits.

pub mod meta_sync;
pub mod recycler;

use std::time::Duration;

pub use meta_sync::{MetaSync, SyncEvent};
pub use recycler::{RecycleTask, Recycler};

/// Queue depth of every worker channel.
pub const CHANNEL_DEPTH: usize = 100;

/// Attempts before a task is dropped.
pub const MAX_TRY_TIMES: u32 = 3;

/// How often and how patiently a worker retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per task, including the first.
    pub max_tries: u32,
    /// Base sleep between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_tries: MAX_TRY_TIMES,
            delay: Duration::from_secs(1),
        }
    }
}
