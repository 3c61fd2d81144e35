// src/ffi/core.rs
// ============================================================================
// Core FFI functions for library initialization and management
// ============================================================================

use crate::config::CoreConfig;
use crate::ffi::{error::FFIError, handle_status_result, to_c_string};
use std::ffi::{c_char, CStr, CString};
use std::os::raw::c_int;

/// Initialize the library with database URL, device ID and offline mode
/// Returns 0 on success, non-zero on error
#[unsafe(no_mangle)]
pub unsafe extern "C" fn initialize_library(
    db_url: *const c_char,
    device_id: *const c_char,
    offline_mode: bool,
) -> c_int {
    let result = std::panic::catch_unwind(|| {
        if db_url.is_null() || device_id.is_null() {
            return Err(FFIError::null_pointer("initialize_library arguments"));
        }

        let db_url_str = match unsafe { CStr::from_ptr(db_url) }.to_str() {
            Ok(s) => s.to_string(),
            Err(_) => return Err(FFIError::invalid_argument("Invalid db_url string")),
        };

        let device_id_str = match unsafe { CStr::from_ptr(device_id) }.to_str() {
            Ok(s) => s.to_string(),
            Err(_) => return Err(FFIError::invalid_argument("Invalid device_id string")),
        };

        let config = CoreConfig::new(&db_url_str, &device_id_str, offline_mode);
        crate::ffi::block_on_async(async { crate::initialize(&config).await })
    });

    match result {
        Ok(ffi_result) => handle_status_result(|| ffi_result),
        Err(panic_payload) => {
            let panic_msg = if let Some(s) = panic_payload.downcast_ref::<String>() {
                s.clone()
            } else if let Some(s) = panic_payload.downcast_ref::<&str>() {
                s.to_string()
            } else {
                "Panicked during FFI call, but panic message is not a string".to_string()
            };
            log::error!("[Rust FFI Panic] in initialize_library: {}", panic_msg);
            handle_status_result(|| Err(FFIError::internal(format!("Panic during initialization: {}", panic_msg))))
        }
    }
}

/// Set offline mode status
#[unsafe(no_mangle)]
pub extern "C" fn set_offline_mode(offline_mode: bool) {
    crate::set_offline_mode(offline_mode);
}

/// Check if the app is in offline mode
#[unsafe(no_mangle)]
pub extern "C" fn is_offline_mode() -> bool {
    crate::is_offline_mode()
}

/// Get the current device ID
/// Returns allocated string that must be freed with free_string()
#[unsafe(no_mangle)]
pub unsafe extern "C" fn get_device_id(result: *mut *mut c_char) -> c_int {
    handle_status_result(|| {
        if result.is_null() {
            return Err(FFIError::null_pointer("result"));
        }

        let device_id = crate::get_device_id()?;
        let c_string = CString::new(device_id)?;

        unsafe { *result = c_string.into_raw() };
        Ok(())
    })
}

/// Get library version
/// Returns allocated string that must be freed with free_string()
#[unsafe(no_mangle)]
pub extern "C" fn get_library_version() -> *mut c_char {
    to_c_string(env!("CARGO_PKG_VERSION").to_string())
}

/// Get last error from thread-local storage as JSON
/// Returns allocated string that must be freed with free_string(), or null if no error
#[unsafe(no_mangle)]
pub extern "C" fn get_last_error() -> *mut c_char {
    crate::ffi::error::get_last_error_message()
}

/// Frees a C string that was allocated by Rust and passed over FFI.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        // Takes ownership back and drops it
        let _ = unsafe { CString::from_raw(ptr) };
    }
}
