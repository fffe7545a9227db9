use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    chunking::Chunk,
    config::ScoringWeights,
    pipeline::Deadline,
    query::QueryAnalysis,
    text_util::{FoldedText, count_occurrences, fold_case, highlight},
};

/// Chunks scored per parallel task. Each shard checks the deadline before it
/// starts, so this also bounds how far a query can overrun its budget.
pub const SHARD_SIZE: usize = 256;

/// Maximum highlights attached to a result.
pub const MAX_HIGHLIGHTS: usize = 3;

/// How a result was found. This crate only produces [`MatchType::Keyword`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Semantic,
    Keyword,
    Hybrid,
}

/// A scored reference to a corpus chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk: Arc<Chunk>,
    pub score: f64,
    pub match_type: MatchType,
    /// Excerpts around matched keywords, at most [`MAX_HIGHLIGHTS`].
    pub highlights: Vec<String>,
}

/// Output of a deadline-bounded retrieval.
#[derive(Debug, Clone, Default)]
pub struct Retrieval {
    pub results: Vec<RetrievalResult>,
    /// True when at least one shard was skipped because the deadline passed.
    pub timed_out: bool,
}

/// Query terms folded once, shared by every shard.
struct PreparedQuery {
    keywords: Vec<String>,
    entity_values: Vec<String>,
}

impl PreparedQuery {
    fn new(analysis: &QueryAnalysis) -> Self {
        let mut entity_values: Vec<String> = Vec::new();
        for entity in &analysis.entities {
            let value = fold_case(&entity.value);
            if !value.is_empty() && !entity_values.contains(&value) {
                entity_values.push(value);
            }
        }

        Self {
            keywords: analysis.keywords.iter().map(|k| fold_case(k)).collect(),
            entity_values,
        }
    }

    fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.entity_values.is_empty()
    }
}

/// Lexical retriever: keyword occurrences plus entity presence.
#[derive(Debug, Clone, Default)]
pub struct Retriever {
    weights: ScoringWeights,
}

impl Retriever {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Score `corpus` against `analysis`, returning at most `limit` results
    /// sorted by descending score. Equal scores keep corpus order.
    pub fn retrieve(
        &self,
        corpus: &[Arc<Chunk>],
        analysis: &QueryAnalysis,
        limit: usize,
    ) -> Vec<RetrievalResult> {
        self.retrieve_until(corpus, analysis, limit, &Deadline::none())
            .results
    }

    /// Like [`Retriever::retrieve`], but shards that have not started when
    /// `deadline` passes are skipped and the outcome is flagged.
    pub fn retrieve_until(
        &self,
        corpus: &[Arc<Chunk>],
        analysis: &QueryAnalysis,
        limit: usize,
        deadline: &Deadline,
    ) -> Retrieval {
        let query = PreparedQuery::new(analysis);
        if query.is_empty() || limit == 0 {
            return Retrieval::default();
        }

        let shards: Vec<Option<Vec<RetrievalResult>>> = corpus
            .par_chunks(SHARD_SIZE)
            .map(|shard| {
                if deadline.expired() {
                    return None;
                }
                Some(
                    shard
                        .iter()
                        .filter_map(|chunk| self.score(chunk, &query))
                        .collect(),
                )
            })
            .collect();

        let timed_out = shards.iter().any(Option::is_none);
        let mut results: Vec<RetrievalResult> =
            shards.into_iter().flatten().flatten().collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(limit);

        if timed_out {
            tracing::warn!(
                kept = results.len(),
                "retrieval deadline passed, shards skipped"
            );
        }

        Retrieval { results, timed_out }
    }

    fn score(
        &self,
        chunk: &Arc<Chunk>,
        query: &PreparedQuery,
    ) -> Option<RetrievalResult> {
        let folded = FoldedText::new(&chunk.content);

        let mut occurrences = 0;
        let mut highlights = Vec::new();
        for keyword in &query.keywords {
            let count = count_occurrences(folded.as_str(), keyword);
            if count == 0 {
                continue;
            }
            occurrences += count;
            if highlights.len() < MAX_HIGHLIGHTS
                && let Some(h) = highlight(&chunk.content, &folded, keyword)
            {
                highlights.push(h);
            }
        }

        let entity_hits = query
            .entity_values
            .iter()
            .filter(|value| folded.as_str().contains(value.as_str()))
            .count();

        let score = self.weights.keyword_occurrence * occurrences as f64
            + self.weights.entity_match * entity_hits as f64;
        if score <= 0.0 {
            return None;
        }

        Some(RetrievalResult {
            chunk: Arc::clone(chunk),
            score,
            match_type: MatchType::Keyword,
            highlights,
        })
    }
}
