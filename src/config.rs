//! Pipeline configuration.
//!
//! Every knob has a default, so an empty JSON object (or no file at all) is a
//! valid configuration. [`PipelineConfig::load`] reads a JSON file and
//! validates it eagerly; invalid thresholds are rejected, never corrected.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    extract::DEFAULT_STOP_WORDS,
};

/// Default minimum chunk length in characters.
pub const DEFAULT_MIN_CHUNK_SIZE: usize = 200;

/// Default maximum chunk length in characters.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1500;

/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_OVERLAP_SIZE: usize = 150;

/// Estimated generation tokens per character. Agglutinative languages pack
/// more characters into each token than English does.
pub const DEFAULT_TOKENS_PER_CHAR: f64 = 0.25;

/// Default number of results kept per query.
pub const DEFAULT_LIMIT: usize = 10;

/// Default wall-clock budget for one query.
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 2_000;

/// A preferred chunk boundary.
///
/// The break lands at the start of the named empty group `cut` when the
/// pattern has one, otherwise at the end of the match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryPattern {
    pub name: String,
    pub pattern: String,
}

impl BoundaryPattern {
    pub fn new(name: &str, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
        }
    }
}

/// Boundary patterns in preference order.
pub fn default_boundary_patterns() -> Vec<BoundaryPattern> {
    vec![
        BoundaryPattern::new("blank_line", r"(?P<cut>)\n[ \t]{0,16}\n"),
        BoundaryPattern::new(
            "sentence_end",
            r"[.!?][ \t\r\n]{1,8}(?P<cut>)\p{Lu}",
        ),
        BoundaryPattern::new(
            "article_start",
            r"\n[ \t]{0,16}(?P<cut>)(?:MADDE|Madde|ARTICLE|Article)[ \t]{1,3}\d",
        ),
        BoundaryPattern::new(
            "legal_structure",
            r"\n[ \t]{0,16}(?P<cut>)(?:\(\d{1,2}\)|[a-zçğıöşü]\)|Fıkra|FIKRA|Bent|BENT|Paragraph|Clause)",
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
    pub overlap_size: usize,
    pub boundary_patterns: Vec<BoundaryPattern>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            overlap_size: DEFAULT_OVERLAP_SIZE,
            boundary_patterns: default_boundary_patterns(),
        }
    }
}

impl ChunkingConfig {
    /// Sizes with the default boundary table.
    pub fn with_sizes(min: usize, max: usize, overlap: usize) -> Self {
        Self {
            min_chunk_size: min,
            max_chunk_size: max,
            overlap_size: overlap,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size == 0 {
            return Err(Error::Config(
                "max_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.min_chunk_size > self.max_chunk_size {
            return Err(Error::Config(format!(
                "min_chunk_size ({}) exceeds max_chunk_size ({})",
                self.min_chunk_size, self.max_chunk_size
            )));
        }
        if self.overlap_size >= self.max_chunk_size {
            return Err(Error::Config(format!(
                "overlap_size ({}) must be smaller than max_chunk_size ({})",
                self.overlap_size, self.max_chunk_size
            )));
        }
        if self.boundary_patterns.is_empty() {
            return Err(Error::Config(
                "boundary pattern table is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Scoring constants for retrieval and reranking.
///
/// These are empirical defaults, not derived values; tune them per corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Per keyword occurrence in the retriever.
    pub keyword_occurrence: f64,
    /// Per distinct query entity found in the chunk, in the retriever.
    pub entity_match: f64,
    /// Per chunk entity overlapping a query entity, in the reranker.
    pub entity_overlap: f64,
    /// Multiplies the fraction of query keywords present, in the reranker.
    pub keyword_coverage: f64,
    /// Multiplies the chunk's static importance, in the reranker.
    pub importance: f64,
    /// Added when the chunk type suits the query intent.
    pub intent_type_boost: f64,
    /// Upper bound of a reranked score.
    pub max_score: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            keyword_occurrence: 0.1,
            entity_match: 0.3,
            entity_overlap: 0.1,
            keyword_coverage: 0.2,
            importance: 0.1,
            intent_type_boost: 0.15,
            max_score: 1.0,
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<()> {
        let all = [
            ("keyword_occurrence", self.keyword_occurrence),
            ("entity_match", self.entity_match),
            ("entity_overlap", self.entity_overlap),
            ("keyword_coverage", self.keyword_coverage),
            ("importance", self.importance),
            ("intent_type_boost", self.intent_type_boost),
            ("max_score", self.max_score),
        ];
        for (name, value) in all {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "weight {name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Synonym table used for query expansion.
pub fn default_synonyms() -> BTreeMap<String, Vec<String>> {
    let entries: &[(&str, &[&str])] = &[
        ("işçi", &["çalışan", "personel"]),
        ("işveren", &["çalıştıran"]),
        ("kanun", &["yasa"]),
        ("yasa", &["kanun"]),
        ("fesih", &["sona erme"]),
        ("tazminat", &["ödence"]),
        ("sözleşme", &["akit", "mukavele"]),
        ("dava", &["yargılama"]),
        ("karar", &["hüküm"]),
        ("kira", &["kiralama"]),
        ("kiracı", &["kiralayan"]),
        ("boşanma", &["evliliğin sona ermesi"]),
        ("miras", &["tereke"]),
        ("ceza", &["yaptırım"]),
        ("itiraz", &["şikayet"]),
    ];

    entries
        .iter()
        .map(|(word, syns)| {
            (
                word.to_string(),
                syns.iter().map(|s| s.to_string()).collect(),
            )
        })
        .collect()
}

fn default_stop_words() -> Vec<String> {
    DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect()
}

/// Top-level configuration for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub chunking: ChunkingConfig,
    pub weights: ScoringWeights,
    pub tokens_per_char: f64,
    pub limit: usize,
    pub query_timeout_ms: u64,
    pub synonyms: BTreeMap<String, Vec<String>>,
    pub stop_words: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            weights: ScoringWeights::default(),
            tokens_per_char: DEFAULT_TOKENS_PER_CHAR,
            limit: DEFAULT_LIMIT,
            query_timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
            synonyms: default_synonyms(),
            stop_words: default_stop_words(),
        }
    }
}

impl PipelineConfig {
    /// Read and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded pipeline config");
        Ok(config)
    }

    /// Load `path` when given, otherwise fall back to defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        self.weights.validate()?;
        if !self.tokens_per_char.is_finite() || self.tokens_per_char <= 0.0 {
            return Err(Error::Config(format!(
                "tokens_per_char must be positive, got {}",
                self.tokens_per_char
            )));
        }
        if self.query_timeout_ms == 0 {
            return Err(Error::Config(
                "query_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
