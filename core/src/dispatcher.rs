//! Entry point that turns a request into a pollable handle.

use std::sync::Arc;

use crate::error::Result;
use crate::executor::BackgroundExecutor;
use crate::handle::RequestHandle;
use crate::http::{RequestOptions, RequestSpec};
use crate::transport::{Transport, UreqTransport};

/// Dispatches requests to background workers.
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct Https {
    executor: BackgroundExecutor,
}

impl Default for Https {
    fn default() -> Self {
        Self::new(UreqTransport::default())
    }
}

impl Https {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_transport(Arc::new(transport))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            executor: BackgroundExecutor::new(transport),
        }
    }

    /// Start `spec` in the background and return its pending handle.
    ///
    /// Never blocks on the network. The URL is not validated here; a
    /// malformed one completes the handle with an error.
    pub fn request(&self, spec: RequestSpec) -> Result<RequestHandle> {
        let handle = RequestHandle::new();
        tracing::debug!(
            request_id = %handle.id(),
            method = %spec.method,
            url = %spec.url,
            timeout_seconds = spec.timeout_seconds,
            "dispatching request"
        );
        self.executor.execute(spec, handle.clone())?;
        Ok(handle)
    }

    pub fn request_with(
        &self,
        url: impl Into<String>,
        options: RequestOptions,
    ) -> Result<RequestHandle> {
        self.request(options.into_spec(url))
    }
}
