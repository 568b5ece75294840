//! Turns a panicking request into `500 InternalError`.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use ferrogate_s3_model::error::S3Error;
use futures::FutureExt;
use tracing::error;

/// Run `fut`, converting a panic into an `InternalError`.
///
/// # Errors
///
/// `InternalError` when `fut` panicked.
pub async fn catch_panic<F: Future>(fut: F, request_id: &str) -> Result<F::Output, S3Error> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(output) => Ok(output),
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(request_id, panic = %message, "request handler panicked");
            Err(S3Error::internal_error(
                "We encountered an internal error. Please try again.",
            ))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
