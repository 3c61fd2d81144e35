// Public modules
pub mod config;
pub mod domains;
pub mod errors;
pub mod ffi;
pub mod globals;
pub mod validation;

// Private modules
mod db_migration;

pub use config::CoreConfig;

// Entry point for initialization
/// Connect, migrate and wire the activity services. Must run before any other call into the library.
pub async fn initialize(config: &CoreConfig) -> ffi::FFIResult<()> {
    globals::initialize(config).await
}

/// Set offline mode status
pub fn set_offline_mode(offline_mode: bool) {
    globals::set_offline_mode(offline_mode);
}

/// Get the current device ID
pub fn get_device_id() -> ffi::FFIResult<String> {
    globals::get_device_id()
}

/// Check if the app is in offline mode
pub fn is_offline_mode() -> bool {
    globals::is_offline_mode()
}

/// Get a reference to the SQLite connection pool
/// This is primarily for internal use
pub fn get_db_pool() -> ffi::FFIResult<sqlx::SqlitePool> {
    globals::get_db_pool()
}
