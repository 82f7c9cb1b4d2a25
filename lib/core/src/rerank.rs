//! Second-stage relevance reranking.
//!
//! Scoring is delegated to an external relevance model behind
//! [`RelevanceScorer`]; this module owns pairing, sorting, optional
//! thresholding and truncation.

use crate::{Candidate, Error, Result};
use std::future::Future;
use tracing::debug;

/// External relevance-scoring collaborator.
///
/// Receives the query and every candidate pair-text in a single batched call
/// and returns one real-valued score per text, in order.
pub trait RelevanceScorer: Send + Sync {
    fn score_batch(
        &self,
        query: &str,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<f32>>> + Send;
}

/// Reranker that re-scores retrieval candidates against the query.
pub struct Reranker<S> {
    scorer: S,
}

impl<S: RelevanceScorer> Reranker<S> {
    pub fn new(scorer: S) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Rerank `candidates` by relevance to `query`, descending.
    ///
    /// With `threshold` set, filtering happens strictly after sorting and
    /// every candidate at or above the threshold is returned; `top_k` is
    /// applied only when `threshold` is absent. Combining both therefore
    /// cannot produce a precise top-N. Degenerates to identity on an empty
    /// candidate list.
    pub async fn rerank(
        &self,
        query: &str,
        mut candidates: Vec<Candidate>,
        top_k: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<Candidate>> {
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let texts: Vec<String> = candidates.iter().map(Candidate::pair_text).collect();
        let scores = self.scorer.score_batch(query, &texts).await?;
        if scores.len() != candidates.len() {
            return Err(Error::Collaborator(format!(
                "relevance scorer returned {} scores for {} candidates",
                scores.len(),
                candidates.len()
            )));
        }

        for (candidate, score) in candidates.iter_mut().zip(scores) {
            candidate.rerank_score = Some(score);
        }

        candidates.sort_by(|a, b| {
            b.rerank_score
                .partial_cmp(&a.rerank_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        match threshold {
            Some(min) => {
                candidates.retain(|c| c.rerank_score.is_some_and(|s| s >= min));
                debug!(
                    "rerank kept {} candidates at or above threshold {}",
                    candidates.len(),
                    min
                );
            }
            None => candidates.truncate(top_k),
        }

        Ok(candidates)
    }
}
