use serde_json::{Map, Value};

use crate::models::report::FilteringReport;
use crate::results::scoring::normalize_score;

const SUMMARY_KEYS: [&str; 3] = ["analysis_summary", "summary_stats", "summary"];

/// Normalizes a filtering-report payload. Returns `None` when there is no
/// report body at all.
pub fn aggregate_report(data: &Value) -> Option<FilteringReport> {
    let obj = data.as_object().filter(|o| !o.is_empty())?;
    let summary = SUMMARY_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_object));

    Some(FilteringReport {
        completed_at: first_present(obj, &["completed_at", "generated_at", "filtered_at"])
            .and_then(text),
        total_resumes: scoped(summary, obj, &["total_resumes", "total_resumes_processed"])
            .and_then(count),
        top_candidate_count: scoped(
            summary,
            obj,
            &[
                "top_candidates",
                "top_candidates_returned",
                "top_candidate_count",
                "top_candidates_count",
            ],
        )
        .and_then(count),
        average_score: scoped(summary, obj, &["average_score", "avg_score"])
            .and_then(normalize_score),
        processing_time: scoped(summary, obj, &["processing_time"]).and_then(text),
        model_version: scoped(summary, obj, &["model_version", "model"]).and_then(text),
        insights: first_present(obj, &["insights", "report_text"]).and_then(text),
    })
}

/// Summary block first, then the top level.
fn scoped<'a>(
    summary: Option<&'a Map<String, Value>>,
    obj: &'a Map<String, Value>,
    keys: &[&str],
) -> Option<&'a Value> {
    summary
        .into_iter()
        .chain(std::iter::once(obj))
        .find_map(|scope| first_present(scope, keys))
}

fn first_present<'a>(scope: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| scope.get(*key).filter(|v| !v.is_null()))
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Array(items) => Some(items.len() as u64),
        _ => None,
    }
}
