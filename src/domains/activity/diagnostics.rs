// src/domains/activity/diagnostics.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag attached to every diagnostic raised while rendering activity rows
pub const ACTIVITY_ADAPTER_TAG: &str = "ActivityAdapter";

/// What was wrong with a record field. Every kind is absorbed by a fallback value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    MissingField,
    UnparseableDate,
    UnrecognizedStatus,
}

/// Record fields the presenter interprets (text fields are copied, never judged)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityField {
    PlannedStartDate,
    PlannedEndDate,
    Progress,
}

impl ActivityField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityField::PlannedStartDate => "plannedStartDate",
            ActivityField::PlannedEndDate => "plannedEndDate",
            ActivityField::Progress => "progress",
        }
    }
}

/// A malformed-input finding, reported as data rather than a formatted message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationDiagnostic {
    pub kind: DiagnosticKind,
    pub field: ActivityField,
    pub raw_value: Option<String>,
}

impl PresentationDiagnostic {
    pub fn missing(field: ActivityField, raw_value: Option<&str>) -> Self {
        Self {
            kind: DiagnosticKind::MissingField,
            field,
            raw_value: raw_value.map(str::to_string),
        }
    }

    pub fn unparseable_date(field: ActivityField, raw_value: &str) -> Self {
        Self {
            kind: DiagnosticKind::UnparseableDate,
            field,
            raw_value: Some(raw_value.to_string()),
        }
    }

    pub fn unrecognized_status(raw_value: &str) -> Self {
        Self {
            kind: DiagnosticKind::UnrecognizedStatus,
            field: ActivityField::Progress,
            raw_value: Some(raw_value.to_string()),
        }
    }
}

impl fmt::Display for PresentationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = self.raw_value.as_deref().unwrap_or("null");
        match (self.kind, self.field) {
            (DiagnosticKind::MissingField, ActivityField::Progress)
            | (DiagnosticKind::UnrecognizedStatus, _) => {
                write!(f, "Invalid progress for activity: {}", raw)
            }
            (DiagnosticKind::MissingField, field) => {
                write!(f, "Missing activity dates: {} = {}", field.as_str(), raw)
            }
            (DiagnosticKind::UnparseableDate, field) => {
                write!(f, "Invalid activity dates: {} = {}", field.as_str(), raw)
            }
        }
    }
}

/// Receives malformed-input reports from whoever drives the presenter
pub trait DiagnosticsSink: Send + Sync {
    fn report(&self, tag: &str, diagnostic: &PresentationDiagnostic);
}

/// Default sink: forwards to the `log` facade at error level, with the tag as the log target
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl LogDiagnostics {
    fn report_to(&self, logger: &dyn log::Log, tag: &str, diagnostic: &PresentationDiagnostic) {
        logger.log(
            &log::Record::builder()
                .level(log::Level::Error)
                .target(tag)
                .module_path(Some(module_path!()))
                .file(Some(file!()))
                .line(Some(line!()))
                .args(format_args!("{}", diagnostic))
                .build(),
        );
    }
}

impl DiagnosticsSink for LogDiagnostics {
    fn report(&self, tag: &str, diagnostic: &PresentationDiagnostic) {
        if log::log_enabled!(target: tag, log::Level::Error) {
            self.report_to(log::logger(), tag, diagnostic);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingDiagnostics;
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            PresentationDiagnostic::missing(ActivityField::PlannedStartDate, Some("")).to_string(),
            "Missing activity dates: plannedStartDate = "
        );
        assert_eq!(
            PresentationDiagnostic::unparseable_date(ActivityField::PlannedEndDate, "20/02/2020").to_string(),
            "Invalid activity dates: plannedEndDate = 20/02/2020"
        );
        assert_eq!(
            PresentationDiagnostic::unrecognized_status("archived").to_string(),
            "Invalid progress for activity: archived"
        );
        assert_eq!(
            PresentationDiagnostic::missing(ActivityField::Progress, None).to_string(),
            "Invalid progress for activity: null"
        );
    }

    #[test]
    fn test_recording_sink_keeps_tag() {
        let sink = RecordingDiagnostics::default();
        sink.report(ACTIVITY_ADAPTER_TAG, &PresentationDiagnostic::unrecognized_status("bogus"));
        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "ActivityAdapter");
        assert_eq!(reports[0].1.kind, DiagnosticKind::UnrecognizedStatus);
    }

    #[derive(Default)]
    struct CapturingLogger {
        records: std::sync::Mutex<Vec<(log::Level, String, String)>>,
    }

    impl log::Log for CapturingLogger {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            self.records.lock().unwrap().push((
                record.level(),
                record.target().to_string(),
                record.args().to_string(),
            ));
        }

        fn flush(&self) {}
    }

    #[test]
    fn test_log_sink_uses_tag_as_target() {
        let logger = CapturingLogger::default();
        LogDiagnostics.report_to(
            &logger,
            ACTIVITY_ADAPTER_TAG,
            &PresentationDiagnostic::unparseable_date(ActivityField::PlannedStartDate, "2020-13-01"),
        );

        let records = logger.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, log::Level::Error);
        assert_eq!(records[0].1, "ActivityAdapter");
        assert_eq!(records[0].2, "Invalid activity dates: plannedStartDate = 2020-13-01");
    }

    #[test]
    fn test_log_sink_does_not_panic_without_logger() {
        LogDiagnostics.report(ACTIVITY_ADAPTER_TAG, &PresentationDiagnostic::missing(ActivityField::Progress, None));
    }
}
