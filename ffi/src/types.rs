//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! The request handle is opaque: C receives a pointer to `FfiRequestHandle`
//! and passes it back into every function. Each such pointer owns one clone of
//! the shared `RequestHandle`, so the background worker and any number of C
//! owners keep the request alive independently.
//!
//! Response bodies are raw bytes (they may contain NUL), so they cross the
//! boundary as pointer + length rather than as C strings.

use std::ffi::CString;
use std::os::raw::c_char;

use https_core::{Headers, Response};

/// Opaque owning reference to an in-flight or completed request.
pub struct FfiRequestHandle {
    pub(crate) inner: https_core::RequestHandle,
}

/// Error codes returned in `FfiResponseResult`.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    NotComplete = 1,
    NullArg = 2,
    Panic = 3,
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// Owned byte buffer. `data` is null when `len` is 0.
#[repr(C)]
pub struct FfiBytes {
    pub data: *mut u8,
    pub len: usize,
}

impl FfiBytes {
    pub(crate) fn empty() -> Self {
        Self {
            data: std::ptr::null_mut(),
            len: 0,
        }
    }

    pub(crate) fn from_vec(bytes: Vec<u8>) -> Self {
        if bytes.is_empty() {
            return Self::empty();
        }
        let boxed = bytes.into_boxed_slice();
        let len = boxed.len();
        let data = Box::into_raw(boxed) as *mut u8;
        Self { data, len }
    }

    /// Release the buffer. Must be called at most once per `from_vec`.
    pub(crate) unsafe fn free(&mut self) {
        if !self.data.is_null() {
            drop(unsafe { Box::from_raw(std::ptr::slice_from_raw_parts_mut(self.data, self.len)) });
            self.data = std::ptr::null_mut();
            self.len = 0;
        }
    }
}

/// Result envelope for `https_request_get_response`.
///
/// On success `error_code` is `Ok`, `error_message` is null, and the
/// response fields are filled. A transport failure is still `Ok` here: it
/// shows up as `status_code == 0` with the description in `body`.
/// Otherwise `error_code` says why no response is available and
/// `error_message` is a human-readable C string.
#[repr(C)]
pub struct FfiResponseResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub status_code: i32,
    pub body: FfiBytes,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
}

impl FfiResponseResult {
    pub(crate) fn ok(response: Response) -> *mut Self {
        let (headers, headers_len) = headers_to_ffi(response.headers);
        Box::into_raw(Box::new(FfiResponseResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            status_code: i32::from(response.status_code),
            body: FfiBytes::from_vec(response.body),
            headers,
            headers_len,
        }))
    }

    pub(crate) fn error(error_code: FfiErrorCode, msg: &str) -> *mut Self {
        Box::into_raw(Box::new(FfiResponseResult {
            error_code,
            error_message: CString::new(msg).unwrap_or_default().into_raw(),
            status_code: 0,
            body: FfiBytes::empty(),
            headers: std::ptr::null_mut(),
            headers_len: 0,
        }))
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::error(FfiErrorCode::NullArg, &format!("null argument: {name}"))
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::error(FfiErrorCode::Panic, msg)
    }
}

/// Convert a header map into a heap array of C string pairs.
///
/// Pairs whose key or value contains a NUL byte cannot be represented and are
/// left out.
fn headers_to_ffi(headers: Headers) -> (*mut FfiHeader, u32) {
    let pairs: Vec<FfiHeader> = headers
        .into_iter()
        .filter_map(|(k, v)| {
            let key = CString::new(k).ok()?;
            let value = CString::new(v).ok()?;
            Some(FfiHeader {
                key: key.into_raw(),
                value: value.into_raw(),
            })
        })
        .collect();

    if pairs.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let len = pairs.len() as u32;
    let ptr = Box::into_raw(pairs.into_boxed_slice()) as *mut FfiHeader;
    (ptr, len)
}
