//! Runs requests off the caller's thread and delivers their outcome.
//!
//! Each request gets its own worker thread. The worker owns the spec and a
//! clone of the handle, so the handle stays alive until the terminal write has
//! landed even if every caller has already dropped theirs. The network call
//! happens outside the handle lock; only the final write takes it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crate::error::Result;
use crate::handle::RequestHandle;
use crate::http::RequestSpec;
use crate::transport::Transport;

const WORKER_THREAD_NAME: &str = "https-request";

#[derive(Clone)]
pub struct BackgroundExecutor {
    transport: Arc<dyn Transport>,
}

impl BackgroundExecutor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Start `spec` on a worker thread that will complete `handle`.
    ///
    /// Returns once the thread is spawned. Fails only when the OS refuses to
    /// create a thread, in which case `handle` is left untouched.
    pub fn execute(&self, spec: RequestSpec, handle: RequestHandle) -> Result<()> {
        let transport = Arc::clone(&self.transport);
        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || deliver(&*transport, &spec, &handle))?;
        Ok(())
    }
}

/// Perform `spec` on the current thread and write exactly one outcome into
/// `handle`.
///
/// A panicking transport is reported as an error outcome.
pub fn deliver(transport: &dyn Transport, spec: &RequestSpec, handle: &RequestHandle) {
    let request_id = handle.id();
    let outcome = catch_unwind(AssertUnwindSafe(|| transport.send(spec)));

    match outcome {
        Ok(Ok(response)) => {
            tracing::debug!(
                %request_id,
                method = %spec.method,
                url = %spec.url,
                status = response.status,
                body_len = response.body.len(),
                "request completed"
            );
            handle.set_response(response.status, response.body, response.headers);
        }
        Ok(Err(err)) => {
            tracing::warn!(%request_id, method = %spec.method, url = %spec.url, error = %err, "request failed");
            handle.set_error(err.to_string());
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(%request_id, url = %spec.url, %message, "transport panicked");
            handle.set_error(format!("transport panicked: {message}"));
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
