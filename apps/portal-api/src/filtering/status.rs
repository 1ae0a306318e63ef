//! Completion detection for the filtering-status payload.
//!
//! The backend reports progress through several overlapping fields and the
//! shape is not stable between versions. Each state is therefore an OR over
//! every signal seen in the wild. Keep it permissive: dropping a path here
//! leaves jobs stuck in Running forever.

use serde_json::Value;

use crate::models::job::JobState;

/// What one status response says about the run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSignal {
    /// `None` means "no signal yet": keep polling.
    pub state: Option<JobState>,
    pub message: Option<String>,
}

impl StatusSignal {
    pub fn is_terminal(&self) -> bool {
        self.state.is_some_and(JobState::is_terminal)
    }
}

/// Classifies the `data` member of a filtering-status response.
///
/// Completed:
/// - top-level `status == "completed"`, or
/// - `filtering_info.status == "completed"`, or
/// - `has_filtering_results` with a non-zero `resume_count`.
///
/// Failed: top-level or `filtering_info` status of `"failed"`.
///
/// Running:
/// - top-level or `filtering_info` status of `"running"`, or
/// - no results yet while `ready_for_filtering` is set.
///
/// Precedence is Completed, then Failed, then Running.
pub fn detect_status(data: &Value) -> StatusSignal {
    let top = status_of(data);
    let info = data.get("filtering_info");
    let nested = info.and_then(status_of);

    let has_results = flag(data, "has_filtering_results");
    let result_count = data.get("resume_count").map(count_of).unwrap_or(0);
    let ready = flag(data, "ready_for_filtering");

    let says = |wanted: &str| top.as_deref() == Some(wanted) || nested.as_deref() == Some(wanted);

    let state = if says("completed") || (has_results && result_count > 0) {
        Some(JobState::Completed)
    } else if says("failed") {
        Some(JobState::Failed)
    } else if says("running") || (!has_results && ready) {
        Some(JobState::Running)
    } else {
        None
    };

    let message = text_of(data, "message").or_else(|| info.and_then(|i| text_of(i, "message")));

    StatusSignal { state, message }
}

fn status_of(value: &Value) -> Option<String> {
    value
        .get("status")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_lowercase())
}

fn flag(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn count_of(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn text_of(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
