pub mod diagnostics;
pub mod presenter;
pub mod repository;
pub mod service;
pub mod types;

pub use diagnostics::{DiagnosticsSink, LogDiagnostics, PresentationDiagnostic};
pub use presenter::ActivityRowPresenter;
pub use repository::{ActivityRepository, SqliteActivityRepository};
pub use service::{ActivityListService, ActivityListServiceImpl, Navigator, SyncRequester};
pub use types::{ActivityListQuery, ActivityListView, ActivityProgress, RawActivityRecord, RowViewModel};
