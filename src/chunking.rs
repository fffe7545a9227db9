//! Boundary-aware chunking of legal documents.
//!
//! A cursor walks the document in windows of at most `max_chunk_size`
//! characters. Each window ends at the furthest preferred boundary (blank
//! line, sentence end, article marker, clause marker) that keeps the chunk at
//! least `min_chunk_size` long, or is hard-cut at the maximum when no
//! boundary qualifies. The next window starts `overlap_size` characters
//! before the previous end.
//!
//! All sizes and offsets are counted in characters, not bytes, so Turkish
//! text with multi-byte letters is sized the same way as ASCII.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    config::ChunkingConfig,
    error::{Error, Result},
    extract::{EntityExtractor, EntityKind},
    text_util::{count_occurrences, fold_case},
};

/// Characters searched on either side of the admissible break range, so
/// patterns whose match straddles the range edge still find their cut. The
/// default patterns reach at most 18 characters from their cut (a newline
/// and up to 16 blanks before it, or a blank line after it).
const BOUNDARY_CONTEXT_CHARS: usize = 32;

/// Base importance every chunk starts with.
const BASE_IMPORTANCE: f64 = 0.3;

const ENTITY_IMPORTANCE_STEP: f64 = 0.05;
const ENTITY_IMPORTANCE_CAP: f64 = 0.2;
const VOCABULARY_IMPORTANCE_STEP: f64 = 0.02;
const VOCABULARY_IMPORTANCE_CAP: f64 = 0.2;

/// Legal vocabulary whose density raises a chunk's importance.
const LEGAL_VOCABULARY: &[&str] = &[
    "kanun", "madde", "hüküm", "mahkeme", "dava", "karar", "yargıtay",
    "danıştay", "yükümlülük", "sözleşme", "tazminat", "fesih", "ceza",
    "itiraz", "temyiz", "istinaf", "tebligat", "icra", "haciz", "zamanaşımı",
    "hukuk", "davacı", "davalı", "sanık", "vekil", "dilekçe", "delil",
    "bilirkişi", "yönetmelik", "mevzuat",
];

static RE_ARTICLE_HEAD: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]{0,16}((?:MADDE|Madde|madde|ARTICLE|Article|Md\.)[ \t]{0,3}\d{1,4})",
    )
    .ok()
});
static RE_NUMBERED_HEADING: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]{0,16}(\d{1,3}\.[ \t]{1,4}\p{Lu}[\p{Lu} \t]{2,80})$")
        .ok()
});
static RE_LIST_ITEM: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]{0,16}(?:[-*•]|\d{1,3}[.)]|[a-zçğıöşü]\))[ \t]{1,8}\S")
        .ok()
});
static RE_TABLE_ROW: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]{0,16}\|[^\n]{1,2000}\|[ \t]{0,16}$").ok()
});
static RE_MARKUP_HEADING: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^#{1,6}[ \t]{1,4}([^\n]{1,200})").ok());

/// Structural shape of a chunk.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Header,
    Paragraph,
    List,
    Table,
    Citation,
    Article,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub document_id: String,
    pub document_title: String,
    /// Zero-based position within the document.
    pub chunk_index: usize,
    /// Number of chunks the document produced.
    pub total_chunks: usize,
    pub chunk_type: ChunkType,
    /// Character offset where the chunk's window starts.
    pub char_start: usize,
    /// Character offset one past the chunk's window.
    pub char_end: usize,
    /// Normalized entity values found in the content, first-seen order.
    pub entities: Vec<String>,
    /// Query-independent relevance prior in `[0, 1]`.
    pub importance: f64,
    /// Article marker or heading the chunk belongs to, empty when unknown.
    pub section: String,
}

/// A bounded, typed span of a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `{document_id}#{chunk_index}`.
    pub id: String,
    /// Window text with surrounding whitespace trimmed.
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Build the id of the chunk at `chunk_index` of a document.
///
/// # Examples
///
/// ```
/// use docket::chunking::chunk_id;
///
/// assert_eq!(chunk_id("a1b2c3", 4), "a1b2c3#4");
/// ```
pub fn chunk_id(document_id: &str, chunk_index: usize) -> String {
    format!("{document_id}#{chunk_index}")
}

/// Splits documents into [`Chunk`]s.
///
/// Construction validates the configuration and compiles the boundary
/// table, so a `Chunker` that exists can chunk any input.
///
/// # Examples
///
/// ```
/// use docket::{chunking::Chunker, config::ChunkingConfig};
///
/// let chunker = Chunker::new(ChunkingConfig::default()).unwrap();
/// let chunks = chunker.chunk("Madde 1 - Kısa bir metin.", "doc", "Kanun");
/// assert_eq!(chunks.len(), 1);
/// assert_eq!(chunks[0].metadata.total_chunks, 1);
///
/// assert!(chunker.chunk("", "doc", "Kanun").is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
    boundaries: Vec<Regex>,
    extractor: EntityExtractor,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;

        let boundaries = config
            .boundary_patterns
            .iter()
            .map(|b| {
                Regex::new(&b.pattern).map_err(|e| {
                    Error::Config(format!(
                        "boundary pattern '{}' is invalid: {e}",
                        b.name
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config,
            boundaries,
            extractor: EntityExtractor::document(),
        })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split `text` into chunks.
    ///
    /// Empty or whitespace-only text yields no chunks.
    pub fn chunk(
        &self,
        text: &str,
        document_id: &str,
        document_title: &str,
    ) -> Vec<Chunk> {
        let min = self.config.min_chunk_size;
        let max = self.config.max_chunk_size;
        let overlap = self.config.overlap_size;

        // Map of char index -> byte index, with the text length appended.
        let char_to_byte: Vec<usize> = text
            .char_indices()
            .map(|(byte_idx, _)| byte_idx)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = char_to_byte.len() - 1;

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut section = String::new();
        let mut cursor = 0;
        // Start of dropped leading text not yet owned by any chunk.
        let mut lead: Option<usize> = None;
        // Start of the last non-blank leading window that was dropped.
        let mut dropped_from = 0;

        while cursor < char_count {
            let covered = chunks
                .last()
                .map_or(cursor, |c| c.metadata.char_end.max(cursor));
            if text[char_to_byte[covered]..].trim().is_empty() {
                match (chunks.last_mut(), lead) {
                    (Some(last), _) => last.metadata.char_end = char_count,
                    (None, Some(start)) => {
                        let content = text[char_to_byte[dropped_from]..].trim();
                        let chunk = self.build_chunk(
                            content,
                            document_id,
                            document_title,
                            0,
                            (start, char_count),
                            &mut section,
                        );
                        chunks.push(chunk);
                    }
                    (None, None) => {}
                }
                break;
            }

            let window_end = (cursor + max).min(char_count);
            let end = if window_end == char_count {
                char_count
            } else {
                self.find_break(
                    text,
                    &char_to_byte,
                    cursor,
                    covered,
                    window_end,
                )
                .unwrap_or(window_end)
            };
            let is_final = end == char_count;

            let raw = &text[char_to_byte[cursor]..char_to_byte[end]];
            let content = raw.trim();
            // The minimum only binds when the window could have been longer.
            let keep = !content.is_empty()
                && (is_final || content.chars().count() >= min);

            if keep {
                let start = if chunks.is_empty() {
                    lead.take().unwrap_or(cursor)
                } else {
                    cursor
                };
                let chunk = self.build_chunk(
                    content,
                    document_id,
                    document_title,
                    chunks.len(),
                    (start, end),
                    &mut section,
                );
                chunks.push(chunk);
            } else if let Some(last) = chunks.last_mut() {
                last.metadata.char_end = last.metadata.char_end.max(end);
            } else {
                lead.get_or_insert(cursor);
                if !content.is_empty() {
                    dropped_from = cursor;
                }
            }

            if is_final {
                break;
            }

            cursor = end.saturating_sub(overlap).max(cursor + 1);
        }

        let total = chunks.len();
        for chunk in &mut chunks {
            chunk.metadata.total_chunks = total;
        }

        tracing::debug!(document_id, chunks = total, "chunked document");
        chunks
    }

    /// Furthest admissible break in `[cursor + min, window_end)`.
    ///
    /// Breaks at or before `covered`, the end of text already owned by a
    /// chunk, are skipped; otherwise an overlapping window would find the
    /// previous break again and crawl forward one character at a time.
    fn find_break(
        &self,
        text: &str,
        char_to_byte: &[usize],
        cursor: usize,
        covered: usize,
        window_end: usize,
    ) -> Option<usize> {
        let lo = cursor + self.config.min_chunk_size;
        if lo >= window_end {
            return None;
        }

        let search_start = lo.saturating_sub(BOUNDARY_CONTEXT_CHARS).max(cursor);
        let search_end =
            (window_end + BOUNDARY_CONTEXT_CHARS).min(char_to_byte.len() - 1);
        let base = char_to_byte[search_start];
        let region = &text[base..char_to_byte[search_end]];

        let mut best: Option<usize> = None;
        for boundary in &self.boundaries {
            for caps in boundary.captures_iter(region) {
                let Some(whole) = caps.get(0) else { continue };
                let cut_byte = base
                    + caps.name("cut").map_or(whole.end(), |m| m.start());
                let Ok(cut) = char_to_byte.binary_search(&cut_byte) else {
                    continue;
                };
                if cut <= covered || cut < lo || cut >= window_end {
                    continue;
                }

                best = best.max(Some(cut));
            }
        }

        best
    }

    fn build_chunk(
        &self,
        content: &str,
        document_id: &str,
        document_title: &str,
        chunk_index: usize,
        (char_start, char_end): (usize, usize),
        section: &mut String,
    ) -> Chunk {
        let found = self.extractor.extract(content);
        let has_case_number =
            found.iter().any(|e| e.kind == EntityKind::CaseNumber);

        let mut entities: Vec<String> = Vec::new();
        for entity in found {
            if !entities.contains(&entity.value) {
                entities.push(entity.value);
            }
        }

        let chunk_type = classify(content, has_case_number);
        if let Some(own) = section_marker(content) {
            *section = own;
        }
        let importance = importance(content, chunk_type, entities.len());

        Chunk {
            id: chunk_id(document_id, chunk_index),
            content: content.to_string(),
            metadata: ChunkMetadata {
                document_id: document_id.to_string(),
                document_title: document_title.to_string(),
                chunk_index,
                total_chunks: 0,
                chunk_type,
                char_start,
                char_end,
                entities,
                importance,
                section: section.clone(),
            },
        }
    }
}

fn matches(pattern: &LazyLock<Option<Regex>>, text: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(text))
}

/// Classify a chunk by its shape, most specific shape first.
pub fn classify(content: &str, has_case_number: bool) -> ChunkType {
    if matches(&RE_ARTICLE_HEAD, content)
        || matches(&RE_NUMBERED_HEADING, content)
    {
        return ChunkType::Article;
    }

    let list_items = RE_LIST_ITEM
        .as_ref()
        .map_or(0, |re| re.find_iter(content).count());
    if list_items >= 2 {
        return ChunkType::List;
    }

    if matches(&RE_TABLE_ROW, content) {
        return ChunkType::Table;
    }
    if has_case_number {
        return ChunkType::Citation;
    }
    if matches(&RE_MARKUP_HEADING, content) {
        return ChunkType::Header;
    }
    ChunkType::Paragraph
}

/// The first article marker or heading in `content`.
fn section_marker(content: &str) -> Option<String> {
    let capture = |pattern: &LazyLock<Option<Regex>>| {
        pattern
            .as_ref()?
            .captures(content)?
            .get(1)
            .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
    };

    capture(&RE_ARTICLE_HEAD)
        .or_else(|| capture(&RE_NUMBERED_HEADING))
        .or_else(|| capture(&RE_MARKUP_HEADING))
}

fn type_bonus(chunk_type: ChunkType) -> f64 {
    match chunk_type {
        ChunkType::Article => 0.3,
        ChunkType::Citation => 0.25,
        ChunkType::Header => 0.1,
        ChunkType::Table | ChunkType::List => 0.05,
        ChunkType::Paragraph => 0.0,
    }
}

/// Static relevance prior of a chunk, clamped to `[0, 1]`.
pub fn importance(content: &str, chunk_type: ChunkType, entities: usize) -> f64 {
    let folded = fold_case(content);
    let vocabulary_hits: usize = LEGAL_VOCABULARY
        .iter()
        .map(|term| count_occurrences(&folded, &fold_case(term)))
        .sum();

    let entity_bonus =
        (entities as f64 * ENTITY_IMPORTANCE_STEP).min(ENTITY_IMPORTANCE_CAP);
    let vocabulary_bonus = (vocabulary_hits as f64 * VOCABULARY_IMPORTANCE_STEP)
        .min(VOCABULARY_IMPORTANCE_CAP);

    (BASE_IMPORTANCE + type_bonus(chunk_type) + entity_bonus + vocabulary_bonus)
        .clamp(0.0, 1.0)
}
