use serde::{Deserialize, Serialize};

/// Job-level summary of a completed filtering run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilteringReport {
    pub completed_at: Option<String>,
    pub total_resumes: Option<u64>,
    pub top_candidate_count: Option<u64>,
    /// Canonical score in [0, 1].
    pub average_score: Option<f64>,
    pub processing_time: Option<String>,
    pub model_version: Option<String>,
    pub insights: Option<String>,
}
