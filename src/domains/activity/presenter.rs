// src/domains/activity/presenter.rs

use crate::domains::activity::diagnostics::{ActivityField, PresentationDiagnostic};
use crate::domains::activity::types::{ActivityProgress, RawActivityRecord, RowViewModel};
use chrono::NaiveDateTime;

/// Timestamp layout of planned dates in the local store
pub const SOURCE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Layout of each end of the displayed date range
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

/// A presented row together with whatever was wrong with its record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub row: RowViewModel,
    pub diagnostics: Vec<PresentationDiagnostic>,
}

/// Maps raw activity records to display rows.
///
/// Stateless: one instance can be shared across threads and rows.
/// Presentation never fails; malformed dates give an empty range and an
/// unknown progress gives the Planned badge.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityRowPresenter;

impl ActivityRowPresenter {
    pub fn new() -> Self {
        Self
    }

    pub fn present(&self, record: &RawActivityRecord) -> RowViewModel {
        self.present_with_diagnostics(record).row
    }

    /// Same row as `present`, plus at most one finding for the date range and one for the status
    pub fn present_with_diagnostics(&self, record: &RawActivityRecord) -> Presentation {
        let mut diagnostics = Vec::new();

        let date_range_text = format_date_range(
            record.planned_start_date.as_deref(),
            record.planned_end_date.as_deref(),
        )
        .unwrap_or_else(|diagnostic| {
            diagnostics.push(diagnostic);
            String::new()
        });

        let status_category = resolve_status(record.progress.as_deref()).unwrap_or_else(|diagnostic| {
            diagnostics.push(diagnostic);
            ActivityProgress::Planned
        });

        Presentation {
            row: RowViewModel {
                description: record.description.clone(),
                activity_type: record.activity_type.clone(),
                date_range_text,
                status_label: status_category.label().to_string(),
                status_category,
            },
            diagnostics,
        }
    }
}

/// `"DD/MM/YYYY - DD/MM/YYYY"` from two source timestamps.
/// Start is checked before end, so the error names the first bad field.
pub fn format_date_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<String, PresentationDiagnostic> {
    let start = require_date(start, ActivityField::PlannedStartDate)?;
    let end = require_date(end, ActivityField::PlannedEndDate)?;

    let start = reformat_date(start, ActivityField::PlannedStartDate)?;
    let end = reformat_date(end, ActivityField::PlannedEndDate)?;

    Ok(format!("{} - {}", start, end))
}

/// Progress code to status category; absent and unknown codes are reported
pub fn resolve_status(progress: Option<&str>) -> Result<ActivityProgress, PresentationDiagnostic> {
    match progress {
        None | Some("") => Err(PresentationDiagnostic::missing(ActivityField::Progress, progress)),
        Some(code) => ActivityProgress::from_code(code)
            .ok_or_else(|| PresentationDiagnostic::unrecognized_status(code)),
    }
}

fn require_date(value: Option<&str>, field: ActivityField) -> Result<&str, PresentationDiagnostic> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        other => Err(PresentationDiagnostic::missing(field, other)),
    }
}

// The literal calendar fields are kept; a trailing Z is matched, not converted.
fn reformat_date(value: &str, field: ActivityField) -> Result<String, PresentationDiagnostic> {
    NaiveDateTime::parse_from_str(value, SOURCE_DATE_FORMAT)
        .map(|dt| dt.format(DISPLAY_DATE_FORMAT).to_string())
        .map_err(|_| PresentationDiagnostic::unparseable_date(field, value))
}
