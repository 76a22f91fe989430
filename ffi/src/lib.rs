//! C-ABI wrapper around `https-core`.
//!
//! # Overview
//! Exposes background HTTPS requests through `extern "C"` functions so any
//! language with a C FFI can start a request, poll it, and read the result
//! without linking against Rust types.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - A single process-wide `Https` dispatcher is created on first use.
//! - `https_request` returns an owning handle pointer. `https_request_retain`
//!   hands out another one; each must be released with `https_request_free`.
//!   The background worker holds its own reference, so freeing every C
//!   pointer early never invalidates the in-flight request.
//! - The C caller owns every returned result and must free it with
//!   `https_free_result`.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::catch_unwind;
use std::sync::OnceLock;

use https_core::{Https, RequestOptions};

use types::*;

fn dispatcher() -> &'static Https {
    static INSTANCE: OnceLock<Https> = OnceLock::new();
    INSTANCE.get_or_init(Https::default)
}

// ---------------------------------------------------------------------------
// Request lifecycle
// ---------------------------------------------------------------------------

/// Start a request in the background.
///
/// `options_json` may be null; otherwise it is a JSON object with any of
/// `method`, `headers` (object of strings), `body` (string) and `timeout`
/// (seconds). `body` may be null; otherwise its `body_len` bytes are sent
/// as-is and take precedence over the options' `body`, which is limited to
/// UTF-8 text. Returns null if `url` is null or not UTF-8, if the options are
/// invalid, or if the worker could not be started.
/// The caller must free the returned pointer with `https_request_free`.
#[unsafe(no_mangle)]
pub extern "C" fn https_request(
    url: *const c_char,
    options_json: *const c_char,
    body: *const u8,
    body_len: usize,
) -> *mut FfiRequestHandle {
    catch_unwind(|| {
        if url.is_null() {
            return std::ptr::null_mut();
        }
        let Ok(url) = unsafe { CStr::from_ptr(url) }.to_str() else {
            return std::ptr::null_mut();
        };
        let options = if options_json.is_null() {
            RequestOptions::default()
        } else {
            let json = unsafe { CStr::from_ptr(options_json) }.to_str().unwrap_or("");
            match RequestOptions::from_json(json) {
                Ok(options) => options,
                Err(e) => {
                    tracing::warn!(error = %e, "rejecting request options");
                    return std::ptr::null_mut();
                }
            }
        };
        let mut spec = options.into_spec(url);
        if !body.is_null() {
            spec = spec.body(unsafe { std::slice::from_raw_parts(body, body_len) }.to_vec());
        }
        match dispatcher().request(spec) {
            Ok(handle) => Box::into_raw(Box::new(FfiRequestHandle { inner: handle })),
            Err(e) => {
                tracing::warn!(error = %e, "failed to dispatch request");
                std::ptr::null_mut()
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Create another owning reference to the same request.
///
/// Returns null if `handle` is null. Free it with `https_request_free`.
#[unsafe(no_mangle)]
pub extern "C" fn https_request_retain(handle: *const FfiRequestHandle) -> *mut FfiRequestHandle {
    catch_unwind(|| {
        if handle.is_null() {
            return std::ptr::null_mut();
        }
        let handle = unsafe { &*handle };
        Box::into_raw(Box::new(FfiRequestHandle {
            inner: handle.inner.clone(),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Release a reference returned by `https_request` or `https_request_retain`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn https_request_free(handle: *mut FfiRequestHandle) {
    if !handle.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(handle) });
        });
    }
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

/// Whether the request has finished. False for null.
#[unsafe(no_mangle)]
pub extern "C" fn https_request_is_complete(handle: *const FfiRequestHandle) -> bool {
    catch_unwind(|| {
        if handle.is_null() {
            return false;
        }
        unsafe { &*handle }.inner.is_complete()
    })
    .unwrap_or(false)
}

/// Read the finished response.
///
/// Yields `NotComplete` while the request is still running; the handle is
/// not affected and may be polled again.
/// The caller must free the returned pointer with `https_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn https_request_get_response(
    handle: *const FfiRequestHandle,
) -> *mut FfiResponseResult {
    catch_unwind(|| {
        if handle.is_null() {
            return FfiResponseResult::null_arg("handle");
        }
        let handle = unsafe { &*handle };
        match handle.inner.require_response() {
            Ok(response) => FfiResponseResult::ok(response),
            Err(e) => FfiResponseResult::error(FfiErrorCode::NotComplete, &e.to_string()),
        }
    })
    .unwrap_or_else(|_| FfiResponseResult::panic("panic in https_request_get_response"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiResponseResult` returned by `https_request_get_response`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn https_free_result(result: *mut FfiResponseResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let mut result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        unsafe { result.body.free() };
        if !result.headers.is_null() && result.headers_len > 0 {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    result.headers,
                    result.headers_len as usize,
                ))
            };
            for h in headers.iter() {
                if !h.key.is_null() {
                    drop(unsafe { CString::from_raw(h.key) });
                }
                if !h.value.is_null() {
                    drop(unsafe { CString::from_raw(h.value) });
                }
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::net::SocketAddr;
    use std::time::{Duration, Instant};

    fn start_server() -> SocketAddr {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        std_listener.set_nonblocking(true).unwrap();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
                mock_server::run(listener).await
            })
            .unwrap();
        });

        addr
    }

    fn wait_for(handle: *const FfiRequestHandle) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !https_request_is_complete(handle) {
            assert!(Instant::now() < deadline, "request did not complete");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn body_of(result: &FfiResponseResult) -> &[u8] {
        if result.body.data.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(result.body.data, result.body.len) }
    }

    fn header_of<'a>(result: &'a FfiResponseResult, key: &str) -> Option<&'a str> {
        if result.headers.is_null() {
            return None;
        }
        let headers =
            unsafe { std::slice::from_raw_parts(result.headers, result.headers_len as usize) };
        headers.iter().find_map(|h| {
            let k = unsafe { CStr::from_ptr(h.key) }.to_str().ok()?;
            (k == key).then(|| unsafe { CStr::from_ptr(h.value) }.to_str().ok())?
        })
    }

    #[test]
    fn request_null_url_returns_null() {
        let handle = https_request(std::ptr::null(), std::ptr::null(), std::ptr::null(), 0);
        assert!(handle.is_null());
    }

    #[test]
    fn request_invalid_options_returns_null() {
        let url = CString::new("http://127.0.0.1:1/").unwrap();
        let options = CString::new(r#"{"timeout":"later"}"#).unwrap();
        let handle = https_request(url.as_ptr(), options.as_ptr(), std::ptr::null(), 0);
        assert!(handle.is_null());
    }

    #[test]
    fn request_free_null_is_safe() {
        https_request_free(std::ptr::null_mut());
    }

    #[test]
    fn free_result_null_is_safe() {
        https_free_result(std::ptr::null_mut());
    }

    #[test]
    fn is_complete_null_is_false() {
        assert!(!https_request_is_complete(std::ptr::null()));
    }

    #[test]
    fn retain_null_returns_null() {
        assert!(https_request_retain(std::ptr::null()).is_null());
    }

    #[test]
    fn get_response_null_returns_null_arg() {
        let result = https_request_get_response(std::ptr::null());
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::NullArg);
        assert!(!r.error_message.is_null());
        https_free_result(result);
    }

    #[test]
    fn get_response_while_pending_is_not_complete() {
        let addr = start_server();
        let url = CString::new(format!("http://{addr}/delay/300")).unwrap();
        let handle = https_request(url.as_ptr(), std::ptr::null(), std::ptr::null(), 0);
        assert!(!handle.is_null());
        assert!(!https_request_is_complete(handle));

        let result = https_request_get_response(handle);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::NotComplete);
        let msg = unsafe { CStr::from_ptr(r.error_message) }.to_str().unwrap();
        assert_eq!(msg, "request is not yet complete");
        assert_eq!(r.status_code, 0);
        https_free_result(result);

        wait_for(handle);
        let result = https_request_get_response(handle);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert_eq!(r.status_code, 200);
        assert_eq!(body_of(r), b"done");
        https_free_result(result);

        https_request_free(handle);
    }

    #[test]
    fn post_with_options_round_trips() {
        let addr = start_server();
        let url = CString::new(format!("http://{addr}/echo")).unwrap();
        let options = CString::new(
            r#"{"method":"POST","body":"ping","headers":{"X-Custom":"Value"},"timeout":5}"#,
        )
        .unwrap();
        let handle = https_request(url.as_ptr(), options.as_ptr(), std::ptr::null(), 0);
        assert!(!handle.is_null());
        wait_for(handle);

        let result = https_request_get_response(handle);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert!(r.error_message.is_null());
        assert_eq!(r.status_code, 200);
        assert_eq!(header_of(r, "content-type"), Some("application/json"));

        let echo: serde_json::Value = serde_json::from_slice(body_of(r)).unwrap();
        assert_eq!(echo["method"], "POST");
        assert_eq!(echo["body"], "ping");
        assert_eq!(echo["headers"]["x-custom"], "Value");

        https_free_result(result);
        https_request_free(handle);
    }

    #[test]
    fn raw_body_bytes_are_sent_unchanged() {
        let addr = start_server();
        let url = CString::new(format!("http://{addr}/bytes")).unwrap();
        let options = CString::new(r#"{"method":"POST","body":"ignored"}"#).unwrap();
        let payload = [0x00u8, 0xFF];
        let handle = https_request(url.as_ptr(), options.as_ptr(), payload.as_ptr(), payload.len());
        assert!(!handle.is_null());
        wait_for(handle);

        let result = https_request_get_response(handle);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert_eq!(r.status_code, 200);
        assert_eq!(body_of(r), &[0x00, 0xFF]);

        https_free_result(result);
        https_request_free(handle);
    }

    #[test]
    fn transport_failure_is_ok_with_zero_status() {
        let url = CString::new("not a url").unwrap();
        let handle = https_request(url.as_ptr(), std::ptr::null(), std::ptr::null(), 0);
        assert!(!handle.is_null());
        wait_for(handle);

        let result = https_request_get_response(handle);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert_eq!(r.status_code, 0);
        assert!(!body_of(r).is_empty());
        assert!(r.headers.is_null());
        assert_eq!(r.headers_len, 0);

        https_free_result(result);
        https_request_free(handle);
    }

    #[test]
    fn retained_reference_outlives_original() {
        let addr = start_server();
        let url = CString::new(format!("http://{addr}/status/204")).unwrap();
        let handle = https_request(url.as_ptr(), std::ptr::null(), std::ptr::null(), 0);
        let second = https_request_retain(handle);
        assert!(!second.is_null());
        https_request_free(handle);

        wait_for(second);
        let result = https_request_get_response(second);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert_eq!(r.status_code, 204);
        assert!(r.body.data.is_null());
        assert_eq!(r.body.len, 0);

        https_free_result(result);
        https_request_free(second);
    }
}
