use std::sync::Arc;

use docket::{
    Chunker,
    ContextAssembler,
    Reranker,
    Retriever,
    chunking::Chunk,
    config::{ChunkingConfig, PipelineConfig, ScoringWeights},
    query::QueryAnalyzer,
    retrieval::{MatchType, RetrievalResult},
};
use proptest::prelude::*;

const FRAGMENTS: &[&str] = &[
    "Madde 1 ",
    "MADDE 12 - ",
    "kira bedeli ",
    "işçi ",
    "İş Kanunu ",
    "4857 sayılı İş Kanunu ",
    "Yargıtay ",
    "2019/1234 E. ",
    "10.000 TL ",
    ". ",
    "\n\n",
    "\n",
    "(1) ",
    "a) ",
    "| a | b |\n",
    "- liste\n",
    "# Başlık\n",
    "    ",
    " ",
    "ğüşıöç ",
];

const QUERY_WORDS: &[&str] = &[
    "kira", "bedeli", "işçi", "kanunu", "madde", "yargıtay", "4857",
    "sayılı", "nedir", "velayet", "liste",
];

fn document() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..80)
        .prop_map(|parts| parts.concat())
}

fn query() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(QUERY_WORDS), 0..5)
        .prop_map(|words| words.join(" "))
}

/// `(min, max, overlap)` with `min <= max` and `overlap < max`.
fn sizes() -> impl Strategy<Value = (usize, usize, usize)> {
    (0usize..50, 0usize..200, 0usize..200).prop_map(|(min, extra, overlap)| {
        let max = min.max(1) + extra;
        (min, max, overlap % max)
    })
}

fn chunker((min, max, overlap): (usize, usize, usize)) -> Chunker {
    Chunker::new(ChunkingConfig::with_sizes(min, max, overlap))
        .expect("generated sizes are valid")
}

fn result(chunk: Chunk, score: f64) -> RetrievalResult {
    RetrievalResult {
        chunk: Arc::new(chunk),
        score,
        match_type: MatchType::Keyword,
        highlights: Vec::new(),
    }
}

proptest! {
    #[test]
    fn chunks_cover_the_document(text in document(), sizes in sizes()) {
        let (_, _, overlap) = sizes;
        let chunks = chunker(sizes).chunk(&text, "d", "t");

        if text.trim().is_empty() {
            prop_assert!(chunks.is_empty());
            return Ok(());
        }

        prop_assert!(!chunks.is_empty());
        prop_assert_eq!(chunks[0].metadata.char_start, 0);
        prop_assert_eq!(
            chunks[chunks.len() - 1].metadata.char_end,
            text.chars().count()
        );
        for pair in chunks.windows(2) {
            let (prev, next) = (&pair[0].metadata, &pair[1].metadata);
            prop_assert!(next.char_start > prev.char_start);
            prop_assert!(next.char_start <= prev.char_end);
            prop_assert!(prev.char_end - next.char_start <= overlap);
        }
    }

    #[test]
    fn chunk_sizes_are_bounded(text in document(), sizes in sizes()) {
        let (min, max, _) = sizes;
        let chunks = chunker(sizes).chunk(&text, "d", "t");

        for (i, chunk) in chunks.iter().enumerate() {
            let len = chunk.content.chars().count();
            prop_assert!(len > 0);
            prop_assert!(len <= max, "chunk {} has {} chars", i, len);
            if i + 1 < chunks.len() {
                prop_assert!(len >= min, "chunk {} has {} chars", i, len);
            }
            prop_assert_eq!(chunk.metadata.chunk_index, i);
            prop_assert_eq!(chunk.metadata.total_chunks, chunks.len());
            prop_assert_eq!(chunk.content.trim(), chunk.content.as_str());
        }
    }

    #[test]
    fn chunking_is_deterministic(text in document(), sizes in sizes()) {
        let c = chunker(sizes);
        prop_assert_eq!(c.chunk(&text, "d", "t"), c.chunk(&text, "d", "t"));
    }

    #[test]
    fn importance_stays_in_unit_range(text in document()) {
        let chunks = chunker((0, 80, 10)).chunk(&text, "d", "t");
        for chunk in &chunks {
            prop_assert!((0.0..=1.0).contains(&chunk.metadata.importance));
        }
    }

    #[test]
    fn retrieval_is_bounded_and_sorted(
        text in document(),
        q in query(),
        limit in 0usize..20,
    ) {
        let corpus: Vec<Arc<Chunk>> = chunker((10, 60, 10))
            .chunk(&text, "d", "t")
            .into_iter()
            .map(Arc::new)
            .collect();
        let analysis = QueryAnalyzer::new(&PipelineConfig::default())
            .expect("default config is valid")
            .analyze(&q);

        let results = Retriever::new(ScoringWeights::default())
            .retrieve(&corpus, &analysis, limit);

        prop_assert!(results.len() <= limit);
        prop_assert!(results.iter().all(|r| r.score > 0.0));
        prop_assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn rerank_orders_and_keeps_results(text in document(), q in query()) {
        let analysis = QueryAnalyzer::new(&PipelineConfig::default())
            .expect("default config is valid")
            .analyze(&q);
        let incoming: Vec<RetrievalResult> = chunker((10, 60, 10))
            .chunk(&text, "d", "t")
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| result(chunk, (i % 3) as f64 * 0.1))
            .collect();
        let mut before: Vec<String> =
            incoming.iter().map(|r| r.chunk.id.clone()).collect();

        let weights = ScoringWeights::default();
        let max_score = weights.max_score;
        let ranked = Reranker::new(weights).rerank(incoming, &analysis);

        prop_assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
        prop_assert!(ranked.iter().all(|r| r.score <= max_score));

        let mut after: Vec<String> =
            ranked.iter().map(|r| r.chunk.id.clone()).collect();
        before.sort();
        after.sort();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn rerank_is_stable_for_equal_chunks(copies in 1usize..30, q in query()) {
        let analysis = QueryAnalyzer::new(&PipelineConfig::default())
            .expect("default config is valid")
            .analyze(&q);
        let template = chunker((0, 200, 0))
            .chunk("Madde 3 - kira bedeli", "d", "t")
            .remove(0);
        let incoming: Vec<RetrievalResult> = (0..copies)
            .map(|i| {
                let mut chunk = template.clone();
                chunk.id = format!("d#{i}");
                result(chunk, 0.5)
            })
            .collect();

        let ranked = Reranker::new(ScoringWeights::default())
            .rerank(incoming, &analysis);
        let ids: Vec<String> = ranked.iter().map(|r| r.chunk.id.clone()).collect();
        let expected: Vec<String> = (0..copies).map(|i| format!("d#{i}")).collect();
        prop_assert_eq!(ids, expected);
    }

    #[test]
    fn packing_is_monotonic(
        text in document(),
        small in 0usize..200,
        extra in 0usize..200,
    ) {
        let results: Vec<RetrievalResult> = chunker((10, 60, 10))
            .chunk(&text, "d", "t")
            .into_iter()
            .map(|chunk| result(chunk, 1.0))
            .collect();
        let assembler = ContextAssembler::default();

        let narrow = assembler.assemble(&results, small);
        let wide = assembler.assemble(&results, small + extra);
        prop_assert!(wide.starts_with(&narrow));
        prop_assert!(assembler.fitting(&results, small) <= results.len());
    }
}
