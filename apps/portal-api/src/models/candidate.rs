use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Classification of a canonical overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    TopTier,   // >= 0.8
    Strong,    // 0.6 - 0.79
    Good,      // 0.4 - 0.59
    Potential, // < 0.4
}

impl Tier {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Tier::TopTier
        } else if score >= 0.6 {
            Tier::Strong
        } else if score >= 0.4 {
            Tier::Good
        } else {
            Tier::Potential
        }
    }
}

/// A category score exactly as the backend sent it. Display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: String,
    pub value: DetailValue,
    /// Display ordering hint for well-known categories. Never used for ranking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
}

/// One resume's evaluation, normalized from whatever shape the backend used.
///
/// Applications and top candidates share this type; the two sets correlate by
/// `filename` because the backend guarantees no stable numeric id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub applicant_name: Option<String>,
    pub applicant_email: Option<String>,
    pub filename: Option<String>,
    pub file_size_bytes: Option<u64>,
    pub uploaded_at: Option<String>,
    /// 1-based; only present in top-candidate sets.
    pub rank: Option<u32>,
    /// Canonical score in [0, 1].
    pub overall_score: Option<f64>,
    pub tier: Option<Tier>,
    pub detail_scores: Vec<CategoryScore>,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub analysis: Option<String>,
    pub recommendation: Option<String>,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    /// Remaining free-text fields, passed through untouched.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub notes: Map<String, Value>,
}

/// Min / max / mean of the canonical scores in a candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl ScoreStats {
    pub fn from_candidates(candidates: &[CandidateRecord]) -> Option<Self> {
        let scores: Vec<f64> = candidates.iter().filter_map(|c| c.overall_score).collect();
        if scores.is_empty() {
            return None;
        }

        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;

        Some(Self {
            count: scores.len(),
            min,
            max,
            mean,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(score: f64) -> CandidateRecord {
        CandidateRecord {
            overall_score: Some(score),
            ..Default::default()
        }
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(Tier::from_score(0.8), Tier::TopTier);
        assert_eq!(Tier::from_score(0.79), Tier::Strong);
        assert_eq!(Tier::from_score(0.6), Tier::Strong);
        assert_eq!(Tier::from_score(0.59), Tier::Good);
        assert_eq!(Tier::from_score(0.4), Tier::Good);
        assert_eq!(Tier::from_score(0.39), Tier::Potential);
        assert_eq!(Tier::from_score(0.0), Tier::Potential);
    }

    #[test]
    fn test_score_stats_skips_unscored() {
        let set = vec![scored(0.9), CandidateRecord::default(), scored(0.5)];
        let stats = ScoreStats::from_candidates(&set).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.min, 0.5);
        assert_eq!(stats.max, 0.9);
        assert!((stats.mean - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_score_stats_empty_is_none() {
        assert!(ScoreStats::from_candidates(&[]).is_none());
        assert!(ScoreStats::from_candidates(&[CandidateRecord::default()]).is_none());
    }
}
