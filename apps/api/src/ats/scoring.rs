//! The arithmetic that turns three signals into one ATS score.
//!
//! Signals:
//! - embedding: cosine similarity of resume and job description, rescaled to [0, 1]
//! - keyword:   share of job-description keywords found in the resume text
//! - rubric:    mean of the model rubric's three sub-scores
//!
//! Final score = Σ(signal × weight), reported as a percentage with one decimal.

use serde::{Deserialize, Serialize};

use crate::ats::rubric::RubricResult;

/// Embedding signal when there is no usable job description.
pub const NEUTRAL_EMBEDDING_SCORE: f64 = 0.75;
/// Keyword signal when there is no job description.
pub const NEUTRAL_KEYWORD_SCORE: f64 = 0.5;
/// A job description must be longer than this (trimmed, in chars) to be embedded.
pub const MIN_JD_CHARS: usize = 10;
pub const DEFAULT_TOP_KEYWORDS: usize = 20;
pub const MAX_RUBRIC_SUGGESTIONS: usize = 5;
pub const KEYWORD_SUGGESTION: &str =
    "Add top job keywords into the Summary / Skills / Experience bullets.";

/// Per-signal weights. Expected to sum to 1; not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreWeights {
    pub embedding: f64,
    pub keyword: f64,
    pub model_rubric: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            embedding: 0.5,
            keyword: 0.2,
            model_rubric: 0.3,
        }
    }
}

/// Caller overrides; each unset weight keeps its default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightOverrides {
    pub embedding: Option<f64>,
    pub keyword: Option<f64>,
    pub model_rubric: Option<f64>,
}

impl WeightOverrides {
    pub fn resolve(&self) -> ScoreWeights {
        let defaults = ScoreWeights::default();
        ScoreWeights {
            embedding: self.embedding.unwrap_or(defaults.embedding),
            keyword: self.keyword.unwrap_or(defaults.keyword),
            model_rubric: self.model_rubric.unwrap_or(defaults.model_rubric),
        }
    }
}

/// Per-call knobs supplied by the caller. Absent and `null` fields behave alike.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreOptions {
    pub weights: Option<WeightOverrides>,
    /// `0` means unset.
    pub top_keywords: Option<usize>,
    /// Budget for the whole call. Falls back to the configured model timeout.
    pub timeout_ms: Option<u64>,
}

impl ScoreOptions {
    pub fn resolved_weights(&self) -> ScoreWeights {
        self.weights.clone().unwrap_or_default().resolve()
    }

    pub fn keyword_limit(&self) -> usize {
        self.top_keywords
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_TOP_KEYWORDS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub embedding_score: f64,
    pub keyword_score: f64,
    pub model_rubric_score: f64,
    pub weights: ScoreWeights,
}

/// Final output of a scoring call. Not persisted here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    /// 0–100, one decimal place.
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub recommendations: Vec<String>,
    pub model_analysis: RubricResult,
}

/// Cosine of the angle between `a` and `b`.
///
/// 0 when lengths differ, either side is empty, or either has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Maps a similarity in [-1, 1] onto [0, 1].
pub fn embedding_signal(similarity: f64) -> f64 {
    ((similarity + 1.0) / 2.0).max(0.0)
}

/// Fraction of `keywords` that occur as substrings of `resume_lower`.
///
/// Plain containment, no word boundaries: "go" matches inside "going".
pub fn keyword_overlap(keywords: &[String], resume_lower: &str) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let matched = keywords
        .iter()
        .filter(|k| resume_lower.contains(k.as_str()))
        .count();
    matched as f64 / keywords.len() as f64
}

/// Weighted sum of the three signals as a 0–100 percentage, one decimal.
pub fn blend(embedding: f64, keyword: f64, rubric: f64, weights: &ScoreWeights) -> f64 {
    let total =
        embedding * weights.embedding + keyword * weights.keyword + rubric * weights.model_rubric;
    (total * 1000.0).round() / 10.0
}

/// Up to five rubric suggestions, plus the keyword tip when a job description
/// was given and the keyword signal is weak.
pub fn build_recommendations(
    rubric: &RubricResult,
    keyword_score: f64,
    has_job_description: bool,
) -> Vec<String> {
    let mut recommendations: Vec<String> = rubric
        .suggestions
        .iter()
        .take(MAX_RUBRIC_SUGGESTIONS)
        .cloned()
        .collect();
    if has_job_description && keyword_score < 0.5 {
        recommendations.push(KEYWORD_SUGGESTION.to_string());
    }
    recommendations
}
