//! Structured access records published to a message bus.
//!
//! Every request that reaches this stage produces one [`AccessLogEntry`].
//! The entry is logged under the `access_log` target and, when a bus is
//! configured, serialized as JSON and handed to [`MessageBus::async_send`]
//! without delaying the response.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Topic access records are published on.
pub const ACCESS_LOG_TOPIC: &str = "access-log";

/// Errors from a [`MessageBus`].
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The bus is shut down.
    #[error("message bus is closed")]
    Closed,
    /// The bus buffer is full; the message was dropped.
    #[error("message bus is full")]
    Full,
    /// The record could not be encoded.
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A fire-and-forget publisher.
#[async_trait]
pub trait MessageBus: Send + Sync + std::fmt::Debug {
    /// Queue `payload` for delivery on `topic`.
    async fn async_send(&self, topic: &str, payload: Vec<u8>) -> Result<(), BusError>;
}

/// One message accepted by a [`ChannelMessageBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Destination topic.
    pub topic: String,
    /// Encoded record.
    pub payload: Vec<u8>,
}

/// In-process bus backed by a bounded channel; a consumer drains the
/// receiver.
#[derive(Debug, Clone)]
pub struct ChannelMessageBus {
    sender: mpsc::Sender<BusMessage>,
}

impl ChannelMessageBus {
    /// Create a bus holding at most `capacity` undelivered messages.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BusMessage>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl MessageBus for ChannelMessageBus {
    async fn async_send(&self, topic: &str, payload: Vec<u8>) -> Result<(), BusError> {
        self.sender
            .try_send(BusMessage {
                topic: topic.to_owned(),
                payload,
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => BusError::Full,
                mpsc::error::TrySendError::Closed(_) => BusError::Closed,
            })
    }
}

/// One access record.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AccessLogEntry {
    /// Completion time.
    pub time: DateTime<Utc>,
    /// Correlation id.
    pub request_id: String,
    /// Operation name, `-` when routing failed.
    pub operation: String,
    /// Addressed bucket.
    pub bucket: Option<String>,
    /// Addressed key.
    pub key: Option<String>,
    /// HTTP method.
    pub method: String,
    /// Request URI.
    pub uri: String,
    /// Response status.
    pub status: u16,
    /// S3 error code of a failed request.
    pub error_code: Option<String>,
    /// Request body length.
    pub bytes_received: u64,
    /// Response body length when known.
    pub bytes_sent: Option<u64>,
    /// Handling time in milliseconds.
    pub total_time_ms: u64,
    /// Requester's user id, `None` when anonymous.
    pub requester: Option<String>,
    /// Client address.
    pub remote_ip: Option<String>,
    /// `User-Agent` header.
    pub user_agent: Option<String>,
    /// `Referer` header.
    pub referer: Option<String>,
}

/// Publishes [`AccessLogEntry`] records.
#[derive(Debug, Clone, Default)]
pub struct AccessLogger {
    bus: Option<Arc<dyn MessageBus>>,
}

impl AccessLogger {
    /// Log records and, when `bus` is set, publish them.
    #[must_use]
    pub fn new(bus: Option<Arc<dyn MessageBus>>) -> Self {
        Self { bus }
    }

    /// Log `entry` and queue it on the bus in the background.
    pub fn record(&self, entry: AccessLogEntry) {
        info!(
            target: "access_log",
            request_id = %entry.request_id,
            operation = %entry.operation,
            bucket = entry.bucket.as_deref().unwrap_or("-"),
            key = entry.key.as_deref().unwrap_or("-"),
            status = entry.status,
            total_time_ms = entry.total_time_ms,
            requester = entry.requester.as_deref().unwrap_or("-"),
            "access"
        );
        let Some(bus) = self.bus.clone() else {
            return;
        };
        tokio::spawn(async move {
            if let Err(e) = publish(bus.as_ref(), &entry).await {
                error!(request_id = %entry.request_id, error = %e, "failed to publish access log");
            } else {
                debug!(request_id = %entry.request_id, "access log published");
            }
        });
    }
}

/// Encode `entry` and send it on [`ACCESS_LOG_TOPIC`].
///
/// # Errors
///
/// Encoding failures and the bus's own errors.
pub async fn publish(bus: &dyn MessageBus, entry: &AccessLogEntry) -> Result<(), BusError> {
    let payload = serde_json::to_vec(entry)?;
    bus.async_send(ACCESS_LOG_TOPIC, payload).await
}
