//! Candidate extraction: turns whatever list shape the backend sent into
//! canonical `CandidateRecord`s.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::models::candidate::{CandidateRecord, CategoryScore, DetailValue, Tier};
use crate::results::scoring::{category_priority, normalize_score};

/// Field names that may hold the candidate array, tried in order before
/// falling back to the first array-valued field.
const LIST_KEYS: [&str; 5] = [
    "top_resumes",
    "resumes",
    "filtered_resumes",
    "top_candidates",
    "candidates",
];

/// Flat score fields, tried in order when there is no `scores` container.
const SCORE_KEYS: [&str; 11] = [
    "score",
    "match_score",
    "similarity_score",
    "ranking_score",
    "ai_score",
    "overall_score",
    "total_score",
    "final_score",
    "percentage",
    "match_percentage",
    "compatibility_score",
];

const DETAIL_MARKERS: [&str; 4] = ["score", "match", "rating", "percentage"];

/// Free-text fields passed through as notes.
const NOTE_KEYS: [&str; 12] = [
    "assessment",
    "evaluation",
    "feedback",
    "notes",
    "comments",
    "description",
    "interview_questions",
    "confidence_level",
    "fit_score",
    "experience_years",
    "skill_match_ratio",
    "professional_development",
];

/// Locates the candidate array in a payload. A payload with no array at all
/// yields an empty slice.
pub fn find_candidate_array(data: &Value) -> &[Value] {
    if let Some(list) = data.as_array() {
        return list;
    }

    let Some(obj) = data.as_object() else {
        return &[];
    };

    LIST_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_array))
        .or_else(|| obj.values().find_map(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// All parseable records in payload order.
pub fn aggregate_candidates(data: &Value) -> Vec<CandidateRecord> {
    find_candidate_array(data)
        .iter()
        .filter_map(parse_candidate)
        .collect()
}

/// Top candidates sorted by rank ascending; unranked entries keep their
/// payload order after the ranked ones.
pub fn aggregate_top_candidates(data: &Value) -> Vec<CandidateRecord> {
    let mut records = aggregate_candidates(data);
    records.sort_by_key(|r| r.rank.unwrap_or(u32::MAX));
    records
}

pub fn parse_candidate(value: &Value) -> Option<CandidateRecord> {
    let obj = value.as_object()?;

    let (overall_score, detail_scores) = match obj.get("scores") {
        Some(Value::Object(scores)) => (
            scores.get("overall").and_then(normalize_score),
            container_details(scores),
        ),
        _ => flat_scores(obj),
    };

    Some(CandidateRecord {
        applicant_name: first_text(obj, &["applicant_name", "name"]),
        applicant_email: first_text(obj, &["applicant_email", "email"]),
        filename: first_text(obj, &["filename", "file_name"]),
        file_size_bytes: ["file_size", "resume_size", "size"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(as_u64)),
        uploaded_at: first_text(obj, &["uploaded_at", "upload_date", "created_at"]),
        rank: obj
            .get("rank")
            .and_then(as_u64)
            .filter(|r| *r >= 1)
            .and_then(|r| u32::try_from(r).ok()),
        overall_score,
        tier: overall_score.map(Tier::from_score),
        detail_scores,
        matched_skills: string_list(obj.get("matched_skills")),
        missing_skills: string_list(obj.get("missing_skills")),
        analysis: first_text(
            obj,
            &["analysis", "ai_analysis", "reasoning", "ai_summary", "summary"],
        ),
        recommendation: first_text(obj, &["recommendation"]),
        strengths: first_list(obj, &["strengths", "positive_points"]),
        concerns: first_list(obj, &["concerns", "weaknesses", "areas_for_improvement"]),
        notes: NOTE_KEYS
            .iter()
            .filter_map(|key| {
                obj.get(*key)
                    .filter(|v| !v.is_null())
                    .map(|v| (key.to_string(), v.clone()))
            })
            .collect(),
    })
}

/// Fills identity fields a top candidate is missing from the application with
/// the same filename.
pub fn correlate_with_applications(top: &mut [CandidateRecord], applications: &[CandidateRecord]) {
    let by_filename: HashMap<&str, &CandidateRecord> = applications
        .iter()
        .filter_map(|a| a.filename.as_deref().map(|f| (f, a)))
        .collect();

    for candidate in top.iter_mut() {
        let Some(app) = candidate
            .filename
            .as_deref()
            .and_then(|f| by_filename.get(f))
        else {
            continue;
        };

        if candidate.applicant_name.is_none() {
            candidate.applicant_name = app.applicant_name.clone();
        }
        if candidate.applicant_email.is_none() {
            candidate.applicant_email = app.applicant_email.clone();
        }
        if candidate.uploaded_at.is_none() {
            candidate.uploaded_at = app.uploaded_at.clone();
        }
        if candidate.file_size_bytes.is_none() {
            candidate.file_size_bytes = app.file_size_bytes;
        }
    }
}

fn container_details(scores: &Map<String, Value>) -> Vec<CategoryScore> {
    scores
        .iter()
        .filter(|(key, _)| key.as_str() != "overall")
        .filter_map(|(key, value)| detail(key, value))
        .collect()
}

fn flat_scores(obj: &Map<String, Value>) -> (Option<f64>, Vec<CategoryScore>) {
    let overall = SCORE_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(normalize_score).map(|s| (*key, s)));

    let details = obj
        .iter()
        .filter(|(key, _)| {
            let key = key.as_str();
            key != "score"
                && key != "overall_score"
                && Some(key) != overall.map(|(k, _)| k)
                && DETAIL_MARKERS.iter().any(|marker| key.contains(marker))
        })
        .filter_map(|(key, value)| detail(key, value))
        .collect();

    (overall.map(|(_, s)| s), details)
}

fn detail(category: &str, value: &Value) -> Option<CategoryScore> {
    let value = match value {
        Value::Number(n) => DetailValue::Number(n.as_f64()?),
        Value::String(s) => DetailValue::Text(s.clone()),
        _ => return None,
    };
    Some(CategoryScore {
        category: category.to_string(),
        value,
        priority: category_priority(category),
    })
}

fn first_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        obj.get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn first_list(obj: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .map(|key| string_list(obj.get(*key)))
        .find(|list| !list.is_empty())
        .unwrap_or_default()
}

/// Arrays keep their string items; a plain string becomes one item per
/// comma-separated part.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
