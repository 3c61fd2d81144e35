use crate::domains::activity::diagnostics::{DiagnosticsSink, PresentationDiagnostic, ACTIVITY_ADAPTER_TAG};
use crate::domains::activity::presenter::ActivityRowPresenter;
use crate::domains::activity::repository::ActivityRepository;
use crate::domains::activity::types::{
    ActivityListEntry, ActivityListQuery, ActivityListState, ActivityListView, RawActivityRecord, RowViewModel,
};
use crate::errors::{ServiceResult, ValidationError};
use crate::validation::Validate;
use async_trait::async_trait;
use std::sync::Arc;

/// Opens the detail/edit screen for one activity
pub trait Navigator: Send + Sync {
    fn open_activity(&self, activity_id: &str);
}

/// Asks the host's sync layer to refresh local data from the server
pub trait SyncRequester: Send + Sync {
    fn request_sync(&self, force: bool);
}

/// A list straight from the store, before anyone outside the core has been told about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedActivityList {
    pub view: ActivityListView,
    pub diagnostics: Vec<PresentationDiagnostic>,
}

/// Trait defining the activity list screen's operations.
///
/// The async methods never call back into the host. Collaborators are only
/// invoked from the synchronous ones, so a host callback may re-enter the
/// library without running inside the async runtime.
#[async_trait]
pub trait ActivityListService: Send + Sync {
    /// Query, present and classify the activities of one project
    async fn fetch_activity_list(&self, query: ActivityListQuery) -> ServiceResult<LoadedActivityList>;

    /// Report the load's diagnostics and request a forced sync when the list is empty
    fn finish_load(&self, loaded: LoadedActivityList) -> ActivityListView;

    /// `fetch_activity_list` followed by `finish_load`
    async fn load_activity_list(&self, query: ActivityListQuery) -> ServiceResult<ActivityListView>;

    /// Present a single record, reporting its diagnostics
    fn present_record(&self, record: &RawActivityRecord) -> RowViewModel;

    /// Navigate to the entry at `position` of a loaded list and return its activity id
    fn select_entry(&self, view: &ActivityListView, position: usize) -> ServiceResult<String>;

    /// Id of a locally stored activity, `EntityNotFound` otherwise
    async fn resolve_selection(&self, activity_id: &str) -> ServiceResult<String>;

    fn open_activity(&self, activity_id: &str);

    /// `resolve_selection` followed by `open_activity`
    async fn select_activity(&self, activity_id: &str) -> ServiceResult<()>;

    /// Hand downloaded activities to the local store
    async fn store_activities(&self, project_id: &str, records: Vec<RawActivityRecord>) -> ServiceResult<u64>;
}

/// Implementation of the activity list service
#[derive(Clone)]
pub struct ActivityListServiceImpl {
    repo: Arc<dyn ActivityRepository>,
    presenter: ActivityRowPresenter,
    diagnostics: Arc<dyn DiagnosticsSink>,
    navigator: Arc<dyn Navigator>,
    sync_requester: Arc<dyn SyncRequester>,
}

impl ActivityListServiceImpl {
    pub fn new(
        repo: Arc<dyn ActivityRepository>,
        diagnostics: Arc<dyn DiagnosticsSink>,
        navigator: Arc<dyn Navigator>,
        sync_requester: Arc<dyn SyncRequester>,
    ) -> Self {
        Self {
            repo,
            presenter: ActivityRowPresenter::new(),
            diagnostics,
            navigator,
            sync_requester,
        }
    }

    fn report_all(&self, diagnostics: &[PresentationDiagnostic]) {
        for diagnostic in diagnostics {
            self.diagnostics.report(ACTIVITY_ADAPTER_TAG, diagnostic);
        }
    }
}

#[async_trait]
impl ActivityListService for ActivityListServiceImpl {
    async fn fetch_activity_list(&self, query: ActivityListQuery) -> ServiceResult<LoadedActivityList> {
        query.validate()?;

        let records = self.repo.find_for_project(&query).await?;
        let mut diagnostics = Vec::new();
        let entries: Vec<ActivityListEntry> = records
            .iter()
            .map(|record| {
                let presentation = self.presenter.present_with_diagnostics(record);
                diagnostics.extend(presentation.diagnostics);
                ActivityListEntry {
                    activity_id: record.activity_id.clone(),
                    row: presentation.row,
                }
            })
            .collect();

        let state = if entries.is_empty() {
            ActivityListState::Empty
        } else {
            ActivityListState::Populated
        };

        Ok(LoadedActivityList {
            view: ActivityListView {
                project_id: query.project_id,
                sort: query.sort,
                search: query.search,
                entries,
                state,
            },
            diagnostics,
        })
    }

    fn finish_load(&self, loaded: LoadedActivityList) -> ActivityListView {
        self.report_all(&loaded.diagnostics);
        if loaded.view.state == ActivityListState::Empty {
            log::info!("No activities for project {}, requesting sync", loaded.view.project_id);
            self.sync_requester.request_sync(true);
        }
        loaded.view
    }

    async fn load_activity_list(&self, query: ActivityListQuery) -> ServiceResult<ActivityListView> {
        let loaded = self.fetch_activity_list(query).await?;
        Ok(self.finish_load(loaded))
    }

    fn present_record(&self, record: &RawActivityRecord) -> RowViewModel {
        let presentation = self.presenter.present_with_diagnostics(record);
        self.report_all(&presentation.diagnostics);
        presentation.row
    }

    fn select_entry(&self, view: &ActivityListView, position: usize) -> ServiceResult<String> {
        if view.is_empty() {
            return Err(ValidationError::invalid_value("position", "the activity list is empty").into());
        }
        let entry = view
            .entry(position)
            .ok_or_else(|| ValidationError::range("position", 0, view.len() - 1))?;
        self.navigator.open_activity(&entry.activity_id);
        Ok(entry.activity_id.clone())
    }

    async fn resolve_selection(&self, activity_id: &str) -> ServiceResult<String> {
        let record = self.repo.find_by_id(activity_id).await?;
        Ok(record.activity_id)
    }

    fn open_activity(&self, activity_id: &str) {
        self.navigator.open_activity(activity_id);
    }

    async fn select_activity(&self, activity_id: &str) -> ServiceResult<()> {
        let activity_id = self.resolve_selection(activity_id).await?;
        self.open_activity(&activity_id);
        Ok(())
    }

    async fn store_activities(&self, project_id: &str, records: Vec<RawActivityRecord>) -> ServiceResult<u64> {
        ActivityListQuery::new(project_id).validate()?;
        if let Some(blank) = records.iter().find(|r| r.activity_id.trim().is_empty()) {
            log::warn!("Rejecting activity batch for project {}: blank activity id {:?}", project_id, blank);
            return Err(ValidationError::required("activity_id").into());
        }
        Ok(self.repo.save_records(project_id, &records).await?)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingNavigator {
        opened: Mutex<Vec<String>>,
    }

    impl RecordingNavigator {
        pub fn opened(&self) -> Vec<String> {
            self.opened.lock().unwrap().clone()
        }
    }

    impl Navigator for RecordingNavigator {
        fn open_activity(&self, activity_id: &str) {
            self.opened.lock().unwrap().push(activity_id.to_string());
        }
    }

    #[derive(Default)]
    pub struct CountingSyncRequester {
        forced: AtomicUsize,
    }

    impl CountingSyncRequester {
        pub fn forced(&self) -> usize {
            self.forced.load(Ordering::SeqCst)
        }
    }

    impl SyncRequester for CountingSyncRequester {
        fn request_sync(&self, force: bool) {
            if force {
                self.forced.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}
