use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::ats::embedding::EmbeddingProvider;
use crate::ats::normalizer::{extract_keywords, resume_to_plain_text};
use crate::ats::rubric::RubricEvaluator;
use crate::ats::scoring::{
    blend, build_recommendations, cosine_similarity, embedding_signal, keyword_overlap,
    ScoreBreakdown, ScoreOptions, ScoreReport, MIN_JD_CHARS, NEUTRAL_EMBEDDING_SCORE,
    NEUTRAL_KEYWORD_SCORE,
};
use crate::ats::AtsError;
use crate::db::DocumentStore;

/// Scores stored resumes. Owns its collaborators; cheap to share behind an `Arc`.
pub struct AtsScorer {
    documents: Arc<dyn DocumentStore>,
    embeddings: EmbeddingProvider,
    rubric: RubricEvaluator,
    default_timeout: Duration,
}

/// Time left for one scoring call.
struct Deadline {
    budget: Duration,
    started: Instant,
}

impl Deadline {
    fn start(budget: Duration) -> Self {
        Self {
            budget,
            started: Instant::now(),
        }
    }

    fn remaining(&self) -> Result<Duration, AtsError> {
        let left = self.budget.saturating_sub(self.started.elapsed());
        if left.is_zero() {
            return Err(AtsError::DeadlineExceeded(self.budget));
        }
        Ok(left)
    }
}

impl AtsScorer {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        embeddings: EmbeddingProvider,
        rubric: RubricEvaluator,
        default_timeout: Duration,
    ) -> Self {
        Self {
            documents,
            embeddings,
            rubric,
            default_timeout,
        }
    }

    /// Scores document `document_id`, optionally against `job_description`.
    ///
    /// A missing or short job description degrades to neutral sub-scores
    /// instead of failing. The final score is never cached.
    pub async fn score(
        &self,
        document_id: &str,
        job_description: Option<&str>,
        options: &ScoreOptions,
    ) -> Result<ScoreReport, AtsError> {
        let budget = options
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_timeout);
        let deadline = Deadline::start(budget);
        let weights = options.resolved_weights();
        let top_keywords = options.keyword_limit();
        let job_description = job_description.filter(|jd| !jd.is_empty());

        let document = tokio::time::timeout(
            deadline.remaining()?,
            self.documents.find_by_id(document_id),
        )
        .await
        .map_err(|_| AtsError::DeadlineExceeded(budget))??
        .ok_or_else(|| AtsError::DocumentNotFound(document_id.to_string()))?;

        let resume_text = resume_to_plain_text(&document);
        debug!(
            "Flattened document {document_id} to {} chars",
            resume_text.chars().count()
        );

        let resume_vector = self
            .embeddings
            .embed(&resume_text, Some(deadline.remaining()?))
            .await?;

        let embedding_score = match job_description {
            Some(jd) if jd.trim().chars().count() > MIN_JD_CHARS => {
                let jd_vector = self
                    .embeddings
                    .embed(jd, Some(deadline.remaining()?))
                    .await?;
                embedding_signal(cosine_similarity(&resume_vector, &jd_vector))
            }
            _ => NEUTRAL_EMBEDDING_SCORE,
        };

        let keyword_score = match job_description {
            Some(jd) => {
                let keywords = extract_keywords(jd, top_keywords);
                keyword_overlap(&keywords, &resume_text.to_lowercase())
            }
            None => NEUTRAL_KEYWORD_SCORE,
        };

        let rubric = self
            .rubric
            .evaluate(&resume_text, job_description, Some(deadline.remaining()?))
            .await?;
        let rubric_score = rubric.mean();

        let score = blend(embedding_score, keyword_score, rubric_score, &weights);
        let recommendations =
            build_recommendations(&rubric, keyword_score, job_description.is_some());

        info!(
            "ATS score {score} for document {document_id} (embedding {:.3}, keyword {:.3}, \
             rubric {:.3}) in {:?}",
            embedding_score,
            keyword_score,
            rubric_score,
            deadline.started.elapsed()
        );

        Ok(ScoreReport {
            score,
            breakdown: ScoreBreakdown {
                embedding_score,
                keyword_score,
                model_rubric_score: rubric_score,
                weights,
            },
            recommendations,
            model_analysis: rubric,
        })
    }
}
