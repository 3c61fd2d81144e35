// In src/ffi/mod.rs
use std::ffi::CString;
use std::future::Future;
use std::os::raw::{c_char, c_int};
use crate::ffi::error::{clear_last_error, set_last_error, ErrorCode, FFIError};
use lazy_static::lazy_static;
use tokio::runtime::Runtime;

pub mod activity;
pub mod core;
pub mod error;

// Re-export FFIResult for convenience within the ffi module
pub use error::FFIResult;

lazy_static! {
    // Shared by every FFI call so the pool's connections outlive a single call
    static ref RUNTIME: Result<Runtime, String> = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| e.to_string());
}

/// Run an async future to completion on the library's runtime.
/// Fails instead of panicking when called from a thread already driving a runtime.
pub fn block_on_async<F, T, E>(future: F) -> FFIResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<FFIError>,
{
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(FFIError::internal(
            "Blocking FFI call made from inside the async runtime".to_string(),
        ));
    }
    let runtime = RUNTIME
        .as_ref()
        .map_err(|e| FFIError::internal(format!("Failed to start async runtime: {}", e)))?;
    runtime.block_on(future).map_err(Into::into)
}

/// Error handling helper for FFI boundaries (returns error code)
pub fn handle_status_result<F>(func: F) -> c_int
where
    F: FnOnce() -> FFIResult<()>,
{
    match func() {
        Ok(_) => {
            clear_last_error();
            ErrorCode::Success as c_int
        }
        Err(e) => {
            log::error!("[Rust FFI Error] Code: {:?}, Message: {}, Details: {:?}",
                        e.code, e.message, e.details.as_deref().unwrap_or("None"));
            set_last_error(&e);
            e.code as c_int
        }
    }
}

/// Hand a string to the caller; null only if it contains an interior NUL
pub fn to_c_string(value: String) -> *mut c_char {
    match CString::new(value) {
        Ok(c_string) => c_string.into_raw(),
        Err(e) => {
            log::error!("[Rust FFI Error] Failed to create CString: {}", e);
            std::ptr::null_mut()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_status_result_codes() {
        assert_eq!(handle_status_result(|| Ok(())), 0);
        assert_eq!(handle_status_result(|| Err(FFIError::invalid_argument("x"))), ErrorCode::InvalidArgument as c_int);
        assert_eq!(error::last_error().map(|e| e.message), Some("x".to_string()));
        assert_eq!(handle_status_result(|| Ok(())), 0);
        assert!(error::last_error().is_none());
    }

    #[test]
    fn test_block_on_async_maps_errors() {
        let ok: FFIResult<u8> = block_on_async(async { Ok::<u8, FFIError>(7) });
        assert_eq!(ok.unwrap(), 7);

        let err = block_on_async(async {
            Err::<(), _>(crate::errors::ValidationError::required("project_id"))
        })
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn test_block_on_async_inside_runtime_is_an_error() {
        let err = block_on_async(async { Ok::<(), FFIError>(()) }).unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalError);
    }
}
