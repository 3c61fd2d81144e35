// src/domains/activity/types.rs

use crate::errors::{DomainResult, ValidationError};
use crate::validation::{Validate, ValidationBuilder};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Maximum length of the free-text search typed into the list's search box
pub const MAX_SEARCH_LENGTH: usize = 200;

/// Text colour drawn on top of every status badge
pub const STATUS_TEXT_COLOR_KEY: &str = "white";

/// RawActivityRecord - one activity row exactly as the local store holds it.
/// Every presented column is optional; the store does not guarantee well-formed data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, Default)]
pub struct RawActivityRecord {
    pub activity_id: String,
    pub description: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
    pub planned_start_date: Option<String>,
    pub planned_end_date: Option<String>,
    pub progress: Option<String>,
}

/// Lifecycle stage of an activity. Drives both the badge letter and its colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityProgress {
    Planned,
    Started,
    Finished,
    Deferred,
    Cancelled,
}

impl ActivityProgress {
    pub const ALL: [ActivityProgress; 5] = [
        ActivityProgress::Planned,
        ActivityProgress::Started,
        ActivityProgress::Finished,
        ActivityProgress::Deferred,
        ActivityProgress::Cancelled,
    ];

    /// Exact, case-sensitive match on the stored progress code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "planned" => Some(ActivityProgress::Planned),
            "started" => Some(ActivityProgress::Started),
            "finished" => Some(ActivityProgress::Finished),
            "deferred" => Some(ActivityProgress::Deferred),
            "cancelled" => Some(ActivityProgress::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityProgress::Planned => "planned",
            ActivityProgress::Started => "started",
            ActivityProgress::Finished => "finished",
            ActivityProgress::Deferred => "deferred",
            ActivityProgress::Cancelled => "cancelled",
        }
    }

    /// Single-letter badge text
    pub fn label(&self) -> &'static str {
        match self {
            ActivityProgress::Planned => "P",
            ActivityProgress::Started => "S",
            ActivityProgress::Finished => "F",
            ActivityProgress::Deferred => "D",
            ActivityProgress::Cancelled => "C",
        }
    }

    /// Colour resource the host uses for the badge background
    pub fn background_color_key(&self) -> &'static str {
        match self {
            ActivityProgress::Planned => "planned_activity_background",
            ActivityProgress::Started => "started_activity_background",
            ActivityProgress::Finished => "finished_activity_background",
            ActivityProgress::Deferred => "deferred_activity_background",
            ActivityProgress::Cancelled => "cancelled_activity_background",
        }
    }
}

impl Default for ActivityProgress {
    fn default() -> Self {
        ActivityProgress::Planned
    }
}

impl fmt::Display for ActivityProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RowViewModel - the display-ready form of one activity, rebuilt on every reload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowViewModel {
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
    pub date_range_text: String,
    pub status_label: String,
    pub status_category: ActivityProgress,
}

impl RowViewModel {
    pub fn status_background_color_key(&self) -> &'static str {
        self.status_category.background_color_key()
    }

    pub fn status_text_color_key(&self) -> &'static str {
        STATUS_TEXT_COLOR_KEY
    }
}

/// Columns the activity list can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ActivitySortField {
    PlannedStartDate,
    PlannedEndDate,
    Description,
    Type,
    Progress,
}

impl ActivitySortField {
    /// Column name as the host refers to it
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivitySortField::PlannedStartDate => "plannedStartDate",
            ActivitySortField::PlannedEndDate => "plannedEndDate",
            ActivitySortField::Description => "description",
            ActivitySortField::Type => "type",
            ActivitySortField::Progress => "progress",
        }
    }

    /// Whitelisted SQL column
    pub fn column(&self) -> &'static str {
        match self {
            ActivitySortField::PlannedStartDate => "planned_start_date",
            ActivitySortField::PlannedEndDate => "planned_end_date",
            ActivitySortField::Description => "description",
            ActivitySortField::Type => "type",
            ActivitySortField::Progress => "progress",
        }
    }
}

impl Default for ActivitySortField {
    fn default() -> Self {
        ActivitySortField::PlannedStartDate
    }
}

impl FromStr for ActivitySortField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "plannedStartDate" | "planned_start_date" => Ok(ActivitySortField::PlannedStartDate),
            "plannedEndDate" | "planned_end_date" => Ok(ActivitySortField::PlannedEndDate),
            "description" => Ok(ActivitySortField::Description),
            "type" => Ok(ActivitySortField::Type),
            "progress" => Ok(ActivitySortField::Progress),
            other => Err(ValidationError::invalid_value(
                "sort",
                &format!("unknown sort column '{}'", other),
            )),
        }
    }
}

impl TryFrom<String> for ActivitySortField {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ActivitySortField> for String {
    fn from(field: ActivitySortField) -> Self {
        field.as_str().to_string()
    }
}

/// Arguments of one activity list load: whose activities, in what order, filtered by what
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityListQuery {
    pub project_id: String,
    #[serde(default)]
    pub sort: ActivitySortField,
    #[serde(default)]
    pub search: Option<String>,
}

impl ActivityListQuery {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            sort: ActivitySortField::default(),
            search: None,
        }
    }

    pub fn sorted_by(mut self, sort: ActivitySortField) -> Self {
        self.sort = sort;
        self
    }

    /// Replace the search text, as typing into the search box does
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// `LIKE` pattern for description/type, `None` for an empty search.
    /// The text is matched as typed, surrounding spaces included.
    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s))
    }

    /// Planned start date is always the secondary key so equal primary keys keep a stable order
    pub fn order_by_clause(&self) -> String {
        match self.sort {
            ActivitySortField::PlannedStartDate => "planned_start_date ASC".to_string(),
            other => format!("{} ASC, planned_start_date ASC", other.column()),
        }
    }
}

impl Validate for ActivityListQuery {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("project_id", Some(self.project_id.clone()))
            .required()
            .not_blank()
            .validate()?;

        if let Some(search) = &self.search {
            ValidationBuilder::new("search", Some(search.clone()))
                .max_length(MAX_SEARCH_LENGTH)
                .validate()?;
        }

        Ok(())
    }
}

/// One rendered row plus the id needed to open it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityListEntry {
    pub activity_id: String,
    pub row: RowViewModel,
}

/// Which of the screen's panels is visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityListState {
    /// Nothing matched; the "no activities" panel is shown and a sync has been requested
    Empty,
    Populated,
}

/// Result of one list load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityListView {
    pub project_id: String,
    pub sort: ActivitySortField,
    pub search: Option<String>,
    pub entries: Vec<ActivityListEntry>,
    pub state: ActivityListState,
}

impl ActivityListView {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, position: usize) -> Option<&ActivityListEntry> {
        self.entries.get(position)
    }
}
