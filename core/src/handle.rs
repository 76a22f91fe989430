//! Thread-safe completion state for one in-flight request.
//!
//! # Design
//! A handle is created pending and transitions to complete exactly once, when
//! the executor performs its terminal write. The four observable fields live in
//! a single `Slot` behind one `Mutex`; readers and the writer always take that
//! lock, so nobody sees `completed == true` paired with a stale body, and the
//! unlock that ends the terminal write is what publishes the result to every
//! later reader.
//!
//! `RequestHandle` is a thin `Arc` wrapper. The caller and the executor thread
//! each hold a clone; the slot is freed when the last clone is dropped, so a
//! caller may walk away from a request without waiting for it.
//!
//! Status `0` means both "still pending" and "transport failure", and a
//! failure stores its message in the body. Use `is_complete` (or
//! `require_response`) to tell the two pending/failed cases apart.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::error::{HttpsError, Result};
use crate::http::Headers;

/// The result of a completed request as one consistent value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub status_code: u16,
    pub body: Vec<u8>,
    pub headers: Headers,
}

/// All four fields read under a single lock acquisition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub completed: bool,
    pub status_code: u16,
    pub body: Vec<u8>,
    pub headers: Headers,
}

#[derive(Debug, Default)]
struct Slot {
    completed: bool,
    status_code: u16,
    body: Vec<u8>,
    headers: Headers,
}

#[derive(Debug)]
struct Shared {
    id: Uuid,
    slot: Mutex<Slot>,
}

/// Shared, pollable handle to a request running in the background.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    shared: Arc<Shared>,
}

impl Default for RequestHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestHandle {
    /// Create a pending handle.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                slot: Mutex::new(Slot::default()),
            }),
        }
    }

    /// Identifier used to correlate log events for this request.
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn is_complete(&self) -> bool {
        self.lock().completed
    }

    /// `0` while pending and after a transport failure.
    pub fn status_code(&self) -> u16 {
        self.lock().status_code
    }

    /// Empty while pending, the payload on success, the failure message on
    /// error.
    pub fn body(&self) -> Vec<u8> {
        self.lock().body.clone()
    }

    /// Independent copy of the response headers.
    pub fn headers(&self) -> Headers {
        self.lock().headers.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        let slot = self.lock();
        Snapshot {
            completed: slot.completed,
            status_code: slot.status_code,
            body: slot.body.clone(),
            headers: slot.headers.clone(),
        }
    }

    /// The completed response, or `HttpsError::NotComplete` while pending.
    ///
    /// Unlike the raw getters this distinguishes "not ready" from "ready and
    /// zero/empty". It never modifies the handle.
    pub fn require_response(&self) -> Result<Response> {
        let slot = self.lock();
        if !slot.completed {
            return Err(HttpsError::NotComplete);
        }
        Ok(Response {
            status_code: slot.status_code,
            body: slot.body.clone(),
            headers: slot.headers.clone(),
        })
    }

    /// Terminal write for a request that produced an HTTP response.
    pub fn set_response(&self, status_code: u16, body: Vec<u8>, headers: Headers) {
        self.complete(Slot {
            completed: true,
            status_code,
            body,
            headers,
        });
    }

    /// Terminal write for a request that failed below the HTTP layer.
    pub fn set_error(&self, message: impl Into<String>) {
        self.complete(Slot {
            completed: true,
            status_code: 0,
            body: message.into().into_bytes(),
            headers: Headers::new(),
        });
    }

    /// Number of live clones, the executor's included.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.shared)
    }

    fn complete(&self, next: Slot) {
        let mut slot = self.lock();
        if slot.completed {
            tracing::warn!(request_id = %self.shared.id, "terminal write on an already completed request");
        }
        *slot = next;
    }

    // The slot is only ever replaced whole, so a guard recovered from a
    // poisoned lock still holds a consistent value.
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.shared.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
