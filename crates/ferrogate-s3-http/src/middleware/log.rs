//! Per-request operational log line.

use std::time::Instant;

use tracing::{info, warn};

/// Timing and identity of a request, logged when it completes.
#[derive(Debug, Clone)]
pub struct RequestLog {
    method: http::Method,
    path: String,
    request_id: String,
    started: Instant,
}

impl RequestLog {
    /// Start timing a request.
    #[must_use]
    pub fn start(parts: &http::request::Parts, request_id: &str) -> Self {
        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_owned(),
            request_id: request_id.to_owned(),
            started: Instant::now(),
        }
    }

    /// Milliseconds since [`RequestLog::start`].
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Emit the completion line. Server errors log at `warn`.
    pub fn finish(&self, operation: &str, status: http::StatusCode) {
        let latency_ms = self.elapsed_ms();
        if status.is_server_error() {
            warn!(
                method = %self.method,
                path = %self.path,
                operation,
                status = status.as_u16(),
                latency_ms,
                request_id = %self.request_id,
                "request failed"
            );
        } else {
            info!(
                method = %self.method,
                path = %self.path,
                operation,
                status = status.as_u16(),
                latency_ms,
                request_id = %self.request_id,
                "request completed"
            );
        }
    }
}
