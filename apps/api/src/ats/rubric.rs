//! Asks the text model to grade a resume and digs the JSON
//! rubric out of whatever comes back.
//!
//! A malformed answer is never an error: the parse falls through three stages
//! and finally lands on a neutral rubric. Only transport failures propagate.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::ats::prompts::{
    JOB_DESCRIPTION_HEADING, RESUME_HEADING, RUBRIC_INSTRUCTION, UNSTRUCTURED_OUTPUT_SUGGESTION,
};
use crate::model_client::{ModelError, ModelInvoker};

/// Resume and job description are each cut to this many characters.
pub const MAX_PROMPT_SECTION_CHARS: usize = 4000;

const NEUTRAL_SUB_SCORE: f64 = 0.7;

const RUBRIC_FIELDS: &[&str] = &["format", "readability", "experience_relevance", "suggestions"];

/// A `{...}` block that runs to the very end of the text.
static TRAILING_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}$").expect("trailing object pattern is valid"));

type Stage = fn(&Value) -> Option<RubricResult>;

const STAGES: &[(&str, Stage)] = &[
    ("structured", structured),
    ("trailing_object", trailing_object),
    ("outer_braces", outer_braces),
];

/// Model-graded quality of a resume. Sub-scores are clamped to [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricResult {
    pub format: f64,
    pub readability: f64,
    pub experience_relevance: f64,
    pub suggestions: Vec<String>,
}

impl RubricResult {
    pub fn neutral() -> Self {
        Self {
            format: NEUTRAL_SUB_SCORE,
            readability: NEUTRAL_SUB_SCORE,
            experience_relevance: NEUTRAL_SUB_SCORE,
            suggestions: vec![UNSTRUCTURED_OUTPUT_SUGGESTION.to_string()],
        }
    }

    /// Mean of the three sub-scores.
    pub fn mean(&self) -> f64 {
        (self.format + self.readability + self.experience_relevance) / 3.0
    }

    /// Reads a rubric out of a JSON object. Missing or non-numeric scores count
    /// as 0; `suggestions` may be a list or a single string.
    fn from_object(obj: &Map<String, Value>) -> Self {
        let score = |field: &str| obj.get(field).and_then(as_score).unwrap_or(0.0);

        let suggestions = match obj.get("suggestions") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|s| s.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
            _ => Vec::new(),
        };

        Self {
            format: score("format"),
            readability: score("readability"),
            experience_relevance: score("experience_relevance"),
            suggestions,
        }
    }
}

fn as_score(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then(|| n.clamp(0.0, 1.0))
}

pub struct RubricEvaluator {
    model: Arc<dyn ModelInvoker>,
    model_id: String,
}

impl RubricEvaluator {
    pub fn new(model: Arc<dyn ModelInvoker>, model_id: impl Into<String>) -> Self {
        Self {
            model,
            model_id: model_id.into(),
        }
    }

    pub async fn evaluate(
        &self,
        resume_text: &str,
        job_description: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<RubricResult, ModelError> {
        let prompt = build_prompt(resume_text, job_description);
        let payload = self.model.invoke(&self.model_id, &prompt, timeout).await?;
        Ok(parse_rubric(&payload))
    }
}

pub fn build_prompt(resume_text: &str, job_description: Option<&str>) -> String {
    let mut parts = vec![
        RUBRIC_INSTRUCTION.to_string(),
        RESUME_HEADING.to_string(),
        truncate_chars(resume_text, MAX_PROMPT_SECTION_CHARS).to_string(),
    ];
    if let Some(jd) = job_description.filter(|jd| !jd.is_empty()) {
        parts.push(JOB_DESCRIPTION_HEADING.to_string());
        parts.push(truncate_chars(jd, MAX_PROMPT_SECTION_CHARS).to_string());
    }
    parts.join("\n\n")
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Turns a model payload into a rubric. Never fails.
pub fn parse_rubric(payload: &Value) -> RubricResult {
    STAGES
        .iter()
        .find_map(|(name, stage)| {
            let rubric = stage(payload)?;
            debug!("Rubric parsed via {name}");
            Some(rubric)
        })
        .unwrap_or_else(|| {
            warn!("Text model returned no usable rubric JSON; using neutral rubric");
            RubricResult::neutral()
        })
}

/// Stage 1: the payload is already an object. Generation envelopes that only
/// wrap text are left to the text stages.
fn structured(payload: &Value) -> Option<RubricResult> {
    let obj = payload.as_object()?;
    let has_rubric_field = RUBRIC_FIELDS.iter().any(|f| obj.contains_key(*f));
    if !has_rubric_field && envelope_text(payload).is_some() {
        return None;
    }
    Some(RubricResult::from_object(obj))
}

/// Stage 2: a `{...}` block anchored at the end of the text.
fn trailing_object(payload: &Value) -> Option<RubricResult> {
    let text = response_text(payload)?.trim();
    let block = TRAILING_OBJECT.find(text)?;
    parse_object(block.as_str())
}

/// Stage 3: everything from the first `{` to the last `}`.
fn outer_braces(payload: &Value) -> Option<RubricResult> {
    let text = response_text(payload)?;
    let first = text.find('{')?;
    let last = text.rfind('}')?;
    if last <= first {
        return None;
    }
    parse_object(&text[first..=last])
}

fn parse_object(candidate: &str) -> Option<RubricResult> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(obj)) => Some(RubricResult::from_object(&obj)),
        _ => None,
    }
}

fn response_text(payload: &Value) -> Option<&str> {
    match payload {
        Value::String(s) => Some(s),
        _ => envelope_text(payload),
    }
}

/// Generated text inside the common text-model response envelopes.
fn envelope_text(payload: &Value) -> Option<&str> {
    let first_result = payload
        .get("results")
        .and_then(|r| r.get(0))
        .and_then(|r| r.get("outputText"));
    let first_content = payload
        .get("content")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("text"));

    first_result
        .or_else(|| payload.get("outputText"))
        .or(first_content)
        .or_else(|| payload.get("completion"))
        .or_else(|| payload.get("generation"))
        .and_then(Value::as_str)
}
