//! Greedy, order-preserving packing of ranked chunks into a token budget.

use crate::{config::DEFAULT_TOKENS_PER_CHAR, retrieval::RetrievalResult};

/// Placed between rendered chunks.
pub const SEPARATOR: &str = "\n\n---\n\n";

/// Renders ranked results into a single context string.
///
/// Results are taken in order until the next one would overflow the budget;
/// packing stops there rather than skipping ahead to a smaller chunk.
///
/// # Examples
///
/// ```
/// use docket::context::ContextAssembler;
///
/// let assembler = ContextAssembler::default();
/// assert_eq!(assembler.assemble(&[], 1_000), "");
/// assert_eq!(assembler.estimate_tokens("abcdefgh"), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextAssembler {
    tokens_per_char: f64,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_TOKENS_PER_CHAR)
    }
}

impl ContextAssembler {
    pub fn new(tokens_per_char: f64) -> Self {
        Self { tokens_per_char }
    }

    /// Estimated token cost of `text`, rounded up.
    pub fn estimate_tokens(&self, text: &str) -> usize {
        (text.chars().count() as f64 * self.tokens_per_char).ceil() as usize
    }

    /// Number of leading results that fit in `max_tokens`.
    pub fn fitting(
        &self,
        results: &[RetrievalResult],
        max_tokens: usize,
    ) -> usize {
        let mut estimated = 0;
        results
            .iter()
            .take_while(|r| {
                estimated += self.estimate_tokens(&r.chunk.content);
                estimated <= max_tokens
            })
            .count()
    }

    pub fn assemble(
        &self,
        results: &[RetrievalResult],
        max_tokens: usize,
    ) -> String {
        if max_tokens == 0 {
            return String::new();
        }

        let included = self.fitting(results, max_tokens);
        results[..included]
            .iter()
            .map(render)
            .collect::<Vec<_>>()
            .join(SEPARATOR)
    }
}

fn render(result: &RetrievalResult) -> String {
    let meta = &result.chunk.metadata;
    if meta.section.is_empty() {
        format!("[{}]\n{}", meta.document_title, result.chunk.content)
    } else {
        format!(
            "[{} - {}]\n{}",
            meta.document_title, meta.section, result.chunk.content
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        chunking::{Chunk, ChunkMetadata, ChunkType},
        retrieval::MatchType,
    };

    fn result(content: &str, section: &str) -> RetrievalResult {
        RetrievalResult {
            chunk: Arc::new(Chunk {
                id: "d#0".to_string(),
                content: content.to_string(),
                metadata: ChunkMetadata {
                    document_id: "d".to_string(),
                    document_title: "İş Kanunu".to_string(),
                    chunk_index: 0,
                    total_chunks: 1,
                    chunk_type: ChunkType::Article,
                    char_start: 0,
                    char_end: content.chars().count(),
                    entities: Vec::new(),
                    importance: 0.6,
                    section: section.to_string(),
                },
            }),
            score: 0.5,
            match_type: MatchType::Keyword,
            highlights: Vec::new(),
        }
    }

    #[test]
    fn renders_header_and_separator() {
        let results = vec![result("birinci", "Madde 1"), result("ikinci", "")];
        let out = ContextAssembler::default().assemble(&results, 100);
        assert_eq!(
            out,
            "[İş Kanunu - Madde 1]\nbirinci\n\n---\n\n[İş Kanunu]\nikinci"
        );
    }

    #[test]
    fn zero_budget_is_empty() {
        let results = vec![result("birinci", "")];
        assert_eq!(ContextAssembler::default().assemble(&results, 0), "");
    }

    #[test]
    fn stops_at_first_overflow() {
        // 40, 400 and 4 chars: 10, 100 and 1 tokens.
        let results = vec![
            result(&"a".repeat(40), ""),
            result(&"b".repeat(400), ""),
            result("cccc", ""),
        ];
        let assembler = ContextAssembler::default();

        assert_eq!(assembler.fitting(&results, 50), 1);
        let out = assembler.assemble(&results, 50);
        assert!(out.contains("aaaa"));
        assert!(!out.contains('c'), "must not skip ahead to a smaller chunk");
    }

    #[test]
    fn estimate_rounds_up() {
        let assembler = ContextAssembler::new(0.25);
        assert_eq!(assembler.estimate_tokens(""), 0);
        assert_eq!(assembler.estimate_tokens("a"), 1);
        assert_eq!(assembler.estimate_tokens("şğüi"), 1);
        assert_eq!(assembler.estimate_tokens("abcde"), 2);
    }

    #[test]
    fn larger_budget_extends_prefix() {
        let results: Vec<_> =
            (0..5).map(|i| result(&"x".repeat(20 * (i + 1)), "")).collect();
        let assembler = ContextAssembler::default();

        let small = assembler.assemble(&results, 20);
        let large = assembler.assemble(&results, 60);
        assert!(large.starts_with(&small));
        assert!(large.len() > small.len());
    }
}
