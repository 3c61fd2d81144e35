// src/ffi/activity.rs
// ============================================================================
// FFI bindings for the activity list screen.
// These wrappers decode the JSON payload sent by the host, forward it to the
// `ActivityListService` and hand the JSON result back across the boundary.
//
// Memory ownership:
//   * Every *mut c_char written to `result` must be released with
//     `activity_free` exactly once.
//   * Strings passed to host callbacks are only valid for the duration of
//     the callback. Copy them if you need them later.
//   * Callbacks run on the calling thread after the async work has finished,
//     so a callback may call back into any function exported here.
// ----------------------------------------------------------------------------

use crate::domains::activity::diagnostics::{DiagnosticsSink, PresentationDiagnostic, ACTIVITY_ADAPTER_TAG};
use crate::domains::activity::presenter::ActivityRowPresenter;
use crate::domains::activity::service::{Navigator, SyncRequester};
use crate::domains::activity::types::{ActivityListQuery, RawActivityRecord, RowViewModel};
use crate::ffi::{block_on_async, error::FFIError, handle_status_result, FFIResult};
use crate::globals;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::sync::Arc;

/// Host callback that opens the detail screen; receives the activity id
pub type NavigationCallback = extern "C" fn(activity_id: *const c_char);

/// Host callback that starts a sync; receives the `force` flag
pub type SyncCallback = extern "C" fn(force: bool);

/// Host callback that receives diagnostics; gets the tag and the diagnostic as JSON
pub type DiagnosticsCallback = extern "C" fn(tag: *const c_char, diagnostic_json: *const c_char);

/// Ensure pointer is not null
macro_rules! ensure_ptr {
    ($ptr:expr) => {
        if $ptr.is_null() {
            return Err(FFIError::null_pointer(stringify!($ptr)));
        }
    };
}

struct CallbackNavigator {
    callback: NavigationCallback,
}

impl Navigator for CallbackNavigator {
    fn open_activity(&self, activity_id: &str) {
        match CString::new(activity_id) {
            Ok(id) => (self.callback)(id.as_ptr()),
            Err(e) => log::error!("Cannot pass activity id {:?} to the host: {}", activity_id, e),
        }
    }
}

struct CallbackSyncRequester {
    callback: SyncCallback,
}

impl SyncRequester for CallbackSyncRequester {
    fn request_sync(&self, force: bool) {
        (self.callback)(force);
    }
}

struct CallbackDiagnostics {
    callback: DiagnosticsCallback,
}

impl DiagnosticsSink for CallbackDiagnostics {
    fn report(&self, tag: &str, diagnostic: &PresentationDiagnostic) {
        let json = match serde_json::to_string(diagnostic) {
            Ok(json) => json,
            Err(e) => {
                log::error!("Cannot serialize diagnostic {}: {}", diagnostic, e);
                return;
            }
        };
        match (CString::new(tag), CString::new(json)) {
            (Ok(tag), Ok(json)) => (self.callback)(tag.as_ptr(), json.as_ptr()),
            _ => log::error!("Cannot pass diagnostic {} to the host", diagnostic),
        }
    }
}

unsafe fn read_payload<T: DeserializeOwned>(payload_json: *const c_char) -> FFIResult<T> {
    let json = unsafe { CStr::from_ptr(payload_json) }
        .to_str()
        .map_err(|_| FFIError::new(crate::ffi::error::ErrorCode::InvalidUtf8, "payload is not valid UTF-8"))?;
    serde_json::from_str(json).map_err(|e| FFIError::invalid_argument(&format!("json {e}")))
}

unsafe fn write_json<T: Serialize>(result: *mut *mut c_char, value: &T) -> FFIResult<()> {
    let json_resp = serde_json::to_string(value).map_err(|e| FFIError::internal(format!("ser {e}")))?;
    let cstr = CString::new(json_resp)?;
    unsafe { *result = cstr.into_raw() };
    Ok(())
}

/// Present through the service when the library is up, otherwise with a bare presenter
fn present(record: &RawActivityRecord) -> FFIResult<RowViewModel> {
    if let Ok(svc) = globals::get_activity_list_service() {
        return Ok(svc.present_record(record));
    }
    let presentation = ActivityRowPresenter::new().present_with_diagnostics(record);
    let sink = globals::get_diagnostics_sink()?;
    for diagnostic in &presentation.diagnostics {
        sink.report(ACTIVITY_ADAPTER_TAG, diagnostic);
    }
    Ok(presentation.row)
}

// ---------------------------------------------------------------------------
// List screen
// ---------------------------------------------------------------------------

/// Load the activity list of a project
/// Expected JSON payload:
/// {
///   "project_id": "string",
///   "sort": "plannedStartDate" | "plannedEndDate" | "description" | "type" | "progress",  (optional)
///   "search": "string"  (optional)
/// }
/// Result: ActivityListView JSON. An empty list also fires the sync callback with `force = true`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn activity_list_load(payload_json: *const c_char, result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        ensure_ptr!(payload_json);
        ensure_ptr!(result);

        let query: ActivityListQuery = read_payload(payload_json)?;
        let svc = globals::get_activity_list_service()?;
        let loaded = block_on_async(svc.fetch_activity_list(query))?;
        // Host callbacks fire here, outside the runtime
        let view = svc.finish_load(loaded);
        write_json(result, &view)
    })
}

/// Present one raw activity record as a row
/// Expected JSON payload: a raw activity record
/// {
///   "activity_id": "string",
///   "description": "string" | null,
///   "type": "string" | null,
///   "planned_start_date": "yyyy-MM-ddTHH:mm:ssZ" | null,
///   "planned_end_date": "yyyy-MM-ddTHH:mm:ssZ" | null,
///   "progress": "string" | null
/// }
/// Result: RowViewModel JSON
#[unsafe(no_mangle)]
pub unsafe extern "C" fn activity_row_present(payload_json: *const c_char, result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        ensure_ptr!(payload_json);
        ensure_ptr!(result);

        let record: RawActivityRecord = read_payload(payload_json)?;
        let row = present(&record)?;
        write_json(result, &row)
    })
}

/// Open the detail screen of a stored activity through the navigation callback
/// Expected JSON payload:
/// {
///   "activity_id": "string"
/// }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn activity_select(payload_json: *const c_char) -> c_int {
    handle_status_result(|| unsafe {
        ensure_ptr!(payload_json);

        #[derive(Deserialize)]
        struct Payload {
            activity_id: String,
        }

        let p: Payload = read_payload(payload_json)?;
        let svc = globals::get_activity_list_service()?;
        let activity_id = block_on_async(svc.resolve_selection(&p.activity_id))?;
        svc.open_activity(&activity_id);
        Ok(())
    })
}

/// Store activities downloaded by the host's sync layer
/// Expected JSON payload:
/// {
///   "project_id": "string",
///   "records": [ raw activity record, ... ]
/// }
/// Result: { "stored": number }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn activity_store_records(payload_json: *const c_char, result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        ensure_ptr!(payload_json);
        ensure_ptr!(result);

        #[derive(Deserialize)]
        struct Payload {
            project_id: String,
            records: Vec<RawActivityRecord>,
        }

        #[derive(Serialize)]
        struct StoreResponse {
            stored: u64,
        }

        let p: Payload = read_payload(payload_json)?;
        let svc = globals::get_activity_list_service()?;
        let stored = block_on_async(svc.store_activities(&p.project_id, p.records))?;
        write_json(result, &StoreResponse { stored })
    })
}

// ---------------------------------------------------------------------------
// Host callbacks
// ---------------------------------------------------------------------------

/// Register the callback used to open an activity's detail screen
#[unsafe(no_mangle)]
pub extern "C" fn activity_register_navigation_callback(callback: Option<NavigationCallback>) -> c_int {
    handle_status_result(|| {
        let callback = callback.ok_or_else(|| FFIError::null_pointer("callback"))?;
        log::info!("Navigation callback registered");
        globals::set_navigator(Arc::new(CallbackNavigator { callback }))
    })
}

/// Register the callback used to request a sync
#[unsafe(no_mangle)]
pub extern "C" fn activity_register_sync_callback(callback: Option<SyncCallback>) -> c_int {
    handle_status_result(|| {
        let callback = callback.ok_or_else(|| FFIError::null_pointer("callback"))?;
        log::info!("Sync callback registered");
        globals::set_sync_requester(Arc::new(CallbackSyncRequester { callback }))
    })
}

/// Register the callback that receives presentation diagnostics in place of the log
#[unsafe(no_mangle)]
pub extern "C" fn activity_register_diagnostics_callback(callback: Option<DiagnosticsCallback>) -> c_int {
    handle_status_result(|| {
        let callback = callback.ok_or_else(|| FFIError::null_pointer("callback"))?;
        log::info!("Diagnostics callback registered");
        globals::set_diagnostics_sink(Arc::new(CallbackDiagnostics { callback }))
    })
}

// ---------------------------------------------------------------------------
// Memory Management
// ---------------------------------------------------------------------------

/// Free memory allocated by Rust for C strings
/// MUST be called by the host for every *mut c_char returned by activity functions
#[unsafe(no_mangle)]
pub unsafe extern "C" fn activity_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::activity::types::{ActivityListState, ActivityListView, ActivityProgress};
    use crate::ffi::error::ErrorCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    static REMEMBERED: Mutex<Vec<String>> = Mutex::new(Vec::new());
    static COUNTED_SYNCS: AtomicUsize = AtomicUsize::new(0);

    // Callbacks registered by the round trip; each one calls back into the library
    static OPENED: Mutex<Vec<(String, c_int)>> = Mutex::new(Vec::new());
    static SYNC_STORE_CODES: Mutex<Vec<c_int>> = Mutex::new(Vec::new());
    static REPORTED: Mutex<Vec<(String, String)>> = Mutex::new(Vec::new());

    extern "C" fn remember_navigation(activity_id: *const c_char) {
        let id = unsafe { CStr::from_ptr(activity_id) }.to_string_lossy().into_owned();
        REMEMBERED.lock().unwrap().push(id);
    }

    extern "C" fn count_sync(force: bool) {
        if force {
            COUNTED_SYNCS.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Detail screen that reloads the list while it opens
    extern "C" fn reload_on_navigation(activity_id: *const c_char) {
        let id = unsafe { CStr::from_ptr(activity_id) }.to_string_lossy().into_owned();
        let query = c(r#"{"project_id":"round-trip"}"#);
        let mut out: *mut c_char = std::ptr::null_mut();
        let code = unsafe { activity_list_load(query.as_ptr(), &mut out) };
        unsafe { activity_free(out) };
        OPENED.lock().unwrap().push((id, code));
    }

    /// Sync layer that downloads and stores records before returning
    extern "C" fn store_on_sync(force: bool) {
        if !force {
            return;
        }
        let records = c(r#"{
            "project_id": "synced-on-demand",
            "records": [{"activity_id": "sd-1", "description": "Install nest boxes", "type": "Fauna",
                         "planned_start_date": "2021-07-01T00:00:00Z", "planned_end_date": "2021-07-02T00:00:00Z",
                         "progress": "planned"}]
        }"#);
        let mut out: *mut c_char = std::ptr::null_mut();
        let code = unsafe { activity_store_records(records.as_ptr(), &mut out) };
        unsafe { activity_free(out) };
        SYNC_STORE_CODES.lock().unwrap().push(code);
    }

    extern "C" fn collect_diagnostic(tag: *const c_char, diagnostic_json: *const c_char) {
        let tag = unsafe { CStr::from_ptr(tag) }.to_string_lossy().into_owned();
        let json = unsafe { CStr::from_ptr(diagnostic_json) }.to_string_lossy().into_owned();
        REPORTED.lock().unwrap().push((tag, json));
    }

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    unsafe fn take_json(ptr: *mut c_char) -> String {
        let json = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
        unsafe { activity_free(ptr) };
        json
    }

    #[test]
    fn test_callback_adapters_forward_to_host() {
        let navigator = CallbackNavigator { callback: remember_navigation };
        navigator.open_activity("adapter-check");
        assert!(REMEMBERED.lock().unwrap().contains(&"adapter-check".to_string()));

        let requester = CallbackSyncRequester { callback: count_sync };
        requester.request_sync(false);
        assert_eq!(COUNTED_SYNCS.load(Ordering::SeqCst), 0);
        requester.request_sync(true);
        assert_eq!(COUNTED_SYNCS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_row_present_from_json() {
        let payload = c(r#"{
            "activity_id": "a1",
            "description": "Remove lantana",
            "type": "Weed Treatment",
            "planned_start_date": "2020-01-15T00:00:00Z",
            "planned_end_date": "2020-02-20T00:00:00Z",
            "progress": "started"
        }"#);
        let mut out: *mut c_char = std::ptr::null_mut();
        let code = unsafe { activity_row_present(payload.as_ptr(), &mut out) };
        assert_eq!(code, 0);

        let row: RowViewModel = serde_json::from_str(&unsafe { take_json(out) }).unwrap();
        assert_eq!(row.description.as_deref(), Some("Remove lantana"));
        assert_eq!(row.date_range_text, "15/01/2020 - 20/02/2020");
        assert_eq!(row.status_label, "S");
        assert_eq!(row.status_category, ActivityProgress::Started);
    }

    #[test]
    fn test_bad_payloads_set_error_codes() {
        let mut out: *mut c_char = std::ptr::null_mut();
        let code = unsafe { activity_row_present(std::ptr::null(), &mut out) };
        assert_eq!(code, ErrorCode::NullPointer as c_int);

        let payload = c("{not json");
        let code = unsafe { activity_row_present(payload.as_ptr(), &mut out) };
        assert_eq!(code, ErrorCode::InvalidArgument as c_int);
        assert!(out.is_null());

        let payload = c(r#"{"project_id":"p1","sort":"colour"}"#);
        let code = unsafe { activity_list_load(payload.as_ptr(), &mut out) };
        assert_eq!(code, ErrorCode::InvalidArgument as c_int);

        assert_eq!(activity_register_navigation_callback(None), ErrorCode::NullPointer as c_int);
        assert_eq!(activity_register_sync_callback(None), ErrorCode::NullPointer as c_int);
        assert_eq!(activity_register_diagnostics_callback(None), ErrorCode::NullPointer as c_int);
    }

    // The only test that initializes the process-wide library state
    #[test]
    fn test_list_screen_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("field.sqlite").display());
        let db_url = c(&db_url);
        let device = c("ipad-test");
        assert_eq!(unsafe { crate::ffi::core::initialize_library(db_url.as_ptr(), device.as_ptr(), true) }, 0);

        assert_eq!(activity_register_navigation_callback(Some(reload_on_navigation)), 0);
        assert_eq!(activity_register_sync_callback(Some(store_on_sync)), 0);
        assert_eq!(activity_register_diagnostics_callback(Some(collect_diagnostic)), 0);

        let mut out: *mut c_char = std::ptr::null_mut();
        let records = c(r#"{
            "project_id": "round-trip",
            "records": [
                {"activity_id": "rt-1", "description": "Spray blackberry", "type": "Weed Treatment",
                 "planned_start_date": "2021-06-01T00:00:00Z", "planned_end_date": "2021-06-30T00:00:00Z",
                 "progress": "finished"},
                {"activity_id": "rt-2", "description": "Plant tubestock", "type": "Revegetation",
                 "planned_start_date": "2021-05-01T00:00:00Z", "planned_end_date": null,
                 "progress": "deferred"}
            ]
        }"#);
        assert_eq!(unsafe { activity_store_records(records.as_ptr(), &mut out) }, 0);
        assert_eq!(unsafe { take_json(out) }, r#"{"stored":2}"#);

        let query = c(r#"{"project_id":"round-trip"}"#);
        assert_eq!(unsafe { activity_list_load(query.as_ptr(), &mut out) }, 0);
        let view: ActivityListView = serde_json::from_str(&unsafe { take_json(out) }).unwrap();
        assert_eq!(view.state, ActivityListState::Populated);
        assert_eq!(view.entries[0].activity_id, "rt-2");
        assert_eq!(view.entries[0].row.date_range_text, "");
        assert_eq!(view.entries[0].row.status_label, "D");
        assert_eq!(view.entries[1].row.date_range_text, "01/06/2021 - 30/06/2021");
        assert_eq!(view.entries[1].row.status_label, "F");

        {
            let reported = REPORTED.lock().unwrap();
            assert!(reported
                .iter()
                .any(|(tag, json)| tag == ACTIVITY_ADAPTER_TAG && json.contains("MissingField")));
        }

        // The navigation callback reloads the list from inside the callback
        let select = c(r#"{"activity_id":"rt-1"}"#);
        assert_eq!(unsafe { activity_select(select.as_ptr()) }, 0);
        assert_eq!(OPENED.lock().unwrap().clone(), vec![("rt-1".to_string(), 0)]);

        let missing = c(r#"{"activity_id":"rt-404"}"#);
        assert_eq!(unsafe { activity_select(missing.as_ptr()) }, ErrorCode::EntityNotFound as c_int);
        assert_eq!(OPENED.lock().unwrap().len(), 1);

        // The sync callback stores records before the empty load returns
        let empty = c(r#"{"project_id":"synced-on-demand"}"#);
        assert_eq!(unsafe { activity_list_load(empty.as_ptr(), &mut out) }, 0);
        let view: ActivityListView = serde_json::from_str(&unsafe { take_json(out) }).unwrap();
        assert_eq!(view.state, ActivityListState::Empty);
        assert_eq!(SYNC_STORE_CODES.lock().unwrap().clone(), vec![0]);

        assert_eq!(unsafe { activity_list_load(empty.as_ptr(), &mut out) }, 0);
        let view: ActivityListView = serde_json::from_str(&unsafe { take_json(out) }).unwrap();
        assert_eq!(view.state, ActivityListState::Populated);
        assert_eq!(view.entries[0].activity_id, "sd-1");
        assert_eq!(SYNC_STORE_CODES.lock().unwrap().len(), 1);

        assert!(crate::is_offline_mode());
    }
}
