use rayon::prelude::*;

use crate::{
    chunking::{Chunk, ChunkType},
    config::ScoringWeights,
    query::{Intent, QueryAnalysis},
    retrieval::RetrievalResult,
    text_util::fold_case,
};

/// Second scoring pass that blends the retrieval score with entity overlap,
/// keyword coverage, chunk importance and an intent/type match.
#[derive(Debug, Clone, Default)]
pub struct Reranker {
    weights: ScoringWeights,
}

impl Reranker {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Replace each result's score with its blended score and sort
    /// descending. Equal scores keep their incoming order.
    pub fn rerank(
        &self,
        mut results: Vec<RetrievalResult>,
        analysis: &QueryAnalysis,
    ) -> Vec<RetrievalResult> {
        let query_entities: Vec<String> = analysis
            .entities
            .iter()
            .map(|e| fold_case(&e.value))
            .filter(|v| !v.is_empty())
            .collect();
        let query_keywords: Vec<String> =
            analysis.keywords.iter().map(|k| fold_case(k)).collect();

        results.par_iter_mut().for_each(|result| {
            result.score = self.final_score(
                result.score,
                &result.chunk,
                analysis,
                &query_entities,
                &query_keywords,
            );
        });

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results
    }

    fn final_score(
        &self,
        base: f64,
        chunk: &Chunk,
        analysis: &QueryAnalysis,
        query_entities: &[String],
        query_keywords: &[String],
    ) -> f64 {
        let w = &self.weights;

        let entity_overlap = chunk
            .metadata
            .entities
            .iter()
            .map(|e| fold_case(e))
            .filter(|value| {
                query_entities.iter().any(|q| {
                    value.contains(q.as_str()) || q.contains(value.as_str())
                })
            })
            .count();

        let folded = fold_case(&chunk.content);
        let keyword_matches = query_keywords
            .iter()
            .filter(|kw| folded.contains(kw.as_str()))
            .count();
        let coverage =
            keyword_matches as f64 / analysis.keywords.len().max(1) as f64;

        let boost = if intent_suits(analysis.intent, chunk.metadata.chunk_type)
        {
            w.intent_type_boost
        } else {
            0.0
        };

        let score = base
            + w.entity_overlap * entity_overlap as f64
            + w.keyword_coverage * coverage
            + w.importance * chunk.metadata.importance
            + boost;

        score.min(w.max_score)
    }
}

/// Whether a chunk type is what an intent is looking for.
pub fn intent_suits(intent: Intent, chunk_type: ChunkType) -> bool {
    matches!(
        (intent, chunk_type),
        (Intent::FindLaw, ChunkType::Article)
            | (Intent::FindCase, ChunkType::Citation)
    )
}
