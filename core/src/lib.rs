//! Asynchronous HTTPS requests behind pollable handles.
//!
//! # Overview
//! `Https::request` hands a `RequestSpec` to a background worker and returns a
//! `RequestHandle` straight away. The worker performs the exchange through a
//! `Transport` and writes exactly one outcome into the handle. The caller
//! polls `is_complete` from any thread and reads the result when it is ready.
//!
//! # Design
//! - `RequestHandle` keeps its four result fields behind one lock so a
//!   completed result is always observed whole.
//! - Ownership of a handle is shared through an `Arc` between the caller and
//!   the worker; dropping the caller's clone never cancels the request.
//! - Transport failures surface as status `0` with the message in the body.
//! - `UreqTransport` is the default network backend; any
//!   `Fn(&RequestSpec) -> Result<HttpResponse, TransportError>` works too.

pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod handle;
pub mod http;
pub mod transport;

pub use dispatcher::Https;
pub use error::{HttpsError, Result, TransportError};
pub use executor::{deliver, BackgroundExecutor};
pub use handle::{RequestHandle, Response, Snapshot};
pub use http::{Headers, HttpResponse, RequestOptions, RequestSpec};
pub use transport::{Transport, TransportConfig, UreqTransport};
