use crate::config::CoreConfig;
use crate::domains::activity::diagnostics::{DiagnosticsSink, LogDiagnostics};
use crate::domains::activity::repository::{ActivityRepository, SqliteActivityRepository};
use crate::domains::activity::service::{ActivityListService, ActivityListServiceImpl, Navigator, SyncRequester};
use crate::errors::{DbError, ServiceError};
use crate::ffi::error::{FFIError, FFIResult};
use lazy_static::lazy_static;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Stands in until the host registers its navigation callback
struct UnregisteredNavigator;

impl Navigator for UnregisteredNavigator {
    fn open_activity(&self, activity_id: &str) {
        log::warn!("No navigation callback registered; cannot open activity {}", activity_id);
    }
}

/// Stands in until the host registers its sync callback
struct UnregisteredSyncRequester;

impl SyncRequester for UnregisteredSyncRequester {
    fn request_sync(&self, force: bool) {
        log::warn!("No sync callback registered; dropping sync request (force: {})", force);
    }
}

// Global state definitions
lazy_static! {
    static ref INIT_MUTEX: tokio::sync::Mutex<()> = tokio::sync::Mutex::new(());
    static ref INITIALIZED: AtomicBool = AtomicBool::new(false);

    static ref DB_POOL: Mutex<Option<SqlitePool>> = Mutex::new(None);
    static ref DEVICE_ID: Mutex<Option<String>> = Mutex::new(None);
    static ref OFFLINE_MODE: Mutex<bool> = Mutex::new(false);

    // Host collaborators
    static ref DIAGNOSTICS_SINK: Mutex<Arc<dyn DiagnosticsSink>> = Mutex::new(Arc::new(LogDiagnostics));
    static ref NAVIGATOR: Mutex<Arc<dyn Navigator>> = Mutex::new(Arc::new(UnregisteredNavigator));
    static ref SYNC_REQUESTER: Mutex<Arc<dyn SyncRequester>> = Mutex::new(Arc::new(UnregisteredSyncRequester));

    // Activity Domain
    static ref ACTIVITY_REPO: Mutex<Option<Arc<dyn ActivityRepository>>> = Mutex::new(None);
    static ref ACTIVITY_LIST_SERVICE: Mutex<Option<Arc<dyn ActivityListService>>> = Mutex::new(None);
}

// --- Getter Functions ---

pub fn get_db_pool() -> FFIResult<SqlitePool> {
    DB_POOL.lock().map_err(|_| FFIError::internal("DB_POOL lock poisoned".to_string()))?.clone().ok_or_else(|| FFIError::internal("Database pool not initialized".to_string()))
}
pub fn get_device_id() -> FFIResult<String> {
    DEVICE_ID.lock().map_err(|_| FFIError::internal("DEVICE_ID lock poisoned".to_string()))?.clone().ok_or_else(|| FFIError::internal("Device ID not initialized".to_string()))
}
pub fn is_offline_mode() -> bool { OFFLINE_MODE.lock().map(|guard| *guard).unwrap_or(false) }
pub fn set_offline_mode(offline: bool) { if let Ok(mut guard) = OFFLINE_MODE.lock() { *guard = offline; } }

pub fn get_activity_list_service() -> FFIResult<Arc<dyn ActivityListService>> {
    ACTIVITY_LIST_SERVICE.lock().map_err(|_| FFIError::internal("ACTIVITY_LIST_SERVICE lock poisoned".to_string()))?.clone().ok_or_else(|| {
        ServiceError::ServiceUnavailable("ActivityListService not initialized; call initialize_library first".to_string()).into()
    })
}

pub fn get_diagnostics_sink() -> FFIResult<Arc<dyn DiagnosticsSink>> {
    Ok(DIAGNOSTICS_SINK.lock().map_err(|_| FFIError::internal("DIAGNOSTICS_SINK lock poisoned".to_string()))?.clone())
}

// --- Collaborator registration ---

pub fn set_navigator(navigator: Arc<dyn Navigator>) -> FFIResult<()> {
    *NAVIGATOR.lock().map_err(|_| FFIError::internal("NAVIGATOR lock poisoned".to_string()))? = navigator;
    rebuild_activity_list_service()
}

pub fn set_sync_requester(sync_requester: Arc<dyn SyncRequester>) -> FFIResult<()> {
    *SYNC_REQUESTER.lock().map_err(|_| FFIError::internal("SYNC_REQUESTER lock poisoned".to_string()))? = sync_requester;
    rebuild_activity_list_service()
}

pub fn set_diagnostics_sink(sink: Arc<dyn DiagnosticsSink>) -> FFIResult<()> {
    *DIAGNOSTICS_SINK.lock().map_err(|_| FFIError::internal("DIAGNOSTICS_SINK lock poisoned".to_string()))? = sink;
    rebuild_activity_list_service()
}

/// Re-create the list service so it picks up the current collaborators.
/// A no-op before initialization; `initialize` builds it once the repository exists.
fn rebuild_activity_list_service() -> FFIResult<()> {
    let repo = match ACTIVITY_REPO.lock().map_err(|_| FFIError::internal("ACTIVITY_REPO lock poisoned".to_string()))?.clone() {
        Some(repo) => repo,
        None => return Ok(()),
    };
    let diagnostics = DIAGNOSTICS_SINK.lock().map_err(|_| FFIError::internal("DIAGNOSTICS_SINK lock poisoned".to_string()))?.clone();
    let navigator = NAVIGATOR.lock().map_err(|_| FFIError::internal("NAVIGATOR lock poisoned".to_string()))?.clone();
    let sync_requester = SYNC_REQUESTER.lock().map_err(|_| FFIError::internal("SYNC_REQUESTER lock poisoned".to_string()))?.clone();

    let service: Arc<dyn ActivityListService> =
        Arc::new(ActivityListServiceImpl::new(repo, diagnostics, navigator, sync_requester));
    *ACTIVITY_LIST_SERVICE.lock().map_err(|_| FFIError::internal("ACTIVITY_LIST_SERVICE lock poisoned".to_string()))? = Some(service);
    Ok(())
}

// --- Initialization ---

/// Connect to the database, migrate it and wire the services. Later calls are no-ops.
pub async fn initialize(config: &CoreConfig) -> FFIResult<()> {
    let _guard = INIT_MUTEX.lock().await;

    if INITIALIZED.load(Ordering::Acquire) {
        log::info!("Library already initialized, skipping");
        return Ok(());
    }

    let result = initialize_internal(config).await;

    // Mark as initialized only if successful
    if result.is_ok() {
        INITIALIZED.store(true, Ordering::Release);
    }

    result
}

async fn initialize_internal(config: &CoreConfig) -> FFIResult<()> {
    // Initialize logging first
    if std::env::var("RUST_LOG").is_err() {
        #[cfg(debug_assertions)]
        std::env::set_var("RUST_LOG", "debug");
        #[cfg(not(debug_assertions))]
        std::env::set_var("RUST_LOG", "info");
    }

    // Initialize env_logger if not already initialized
    let _ = env_logger::try_init();

    config.validate()?;

    log::info!("Starting internal initialization");
    log::debug!("Database URL: {}", config.db_url);
    log::debug!("Device ID: {}", config.device_id);
    log::debug!("Offline mode: {}", config.offline_mode);

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.db_url)
        .await
        .map_err(|e| {
            log::error!("Database connection failed: {}", e);
            DbError::ConnectionPool(format!("Database connection failed: {}", e))
        })?;
    log::info!("Database connection established");

    *DB_POOL.lock().map_err(|_| FFIError::internal("DB_POOL lock poisoned".to_string()))? = Some(pool.clone());

    // Run database migrations BEFORE creating services
    crate::db_migration::initialize_database().await?;

    *DEVICE_ID.lock().map_err(|_| FFIError::internal("DEVICE_ID lock poisoned".to_string()))? = Some(config.device_id.clone());
    set_offline_mode(config.offline_mode);

    let activity_repo: Arc<dyn ActivityRepository> = Arc::new(SqliteActivityRepository::new(pool));
    *ACTIVITY_REPO.lock().map_err(|_| FFIError::internal("ACTIVITY_REPO lock poisoned".to_string()))? = Some(activity_repo);
    rebuild_activity_list_service()?;

    log::info!("Internal initialization complete");
    Ok(())
}
