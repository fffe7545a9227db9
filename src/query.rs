//! Query analysis: intent, entities, keywords, expansions and filters.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    config::PipelineConfig,
    error::Result,
    extract::{Entity, EntityExtractor, EntityKind, KeywordExtractor},
    text_util::{fold_case, replace_word},
};

/// Maximum number of expanded queries, the original included.
pub const MAX_EXPANSIONS: usize = 5;

/// Years outside `[MIN_YEAR, MAX_YEAR)` are ignored by the filters.
pub const MIN_YEAR: u16 = 1900;
pub const MAX_YEAR: u16 = 2100;

const CASE_SUFFIX: &str = "yargıtay kararı";
const LAW_SUFFIX: &str = "kanun maddesi";

/// The purpose of a query. Variants are listed in detection priority order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    FindLaw,
    FindCase,
    ExplainConcept,
    Compare,
    Procedure,
    General,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Intent::FindLaw => "find_law",
            Intent::FindCase => "find_case",
            Intent::ExplainConcept => "explain_concept",
            Intent::Compare => "compare",
            Intent::Procedure => "procedure",
            Intent::General => "general",
        };
        f.write_str(name)
    }
}

/// Intent patterns, tried in order against the case-folded query. The first
/// intent with any matching pattern wins.
const INTENT_PATTERNS: &[(Intent, &[&str])] = &[
    (
        Intent::FindLaw,
        &[
            r"\bkanun",
            r"\byasa(?:sı|nın|ya)?\b",
            r"\bmadde(?:si|sinde)?\b",
            r"\bmd\.",
            r"\bsayılı\b",
            r"\bmevzuat",
            r"\byönetmeli[kğ]",
            r"\b(?:law|statute|article|regulation)s?\b",
        ],
    ),
    (
        Intent::FindCase,
        &[
            r"\byargıtay\b",
            r"\bdanıştay\b",
            r"\bkarar(?:ı|lar|ları|larda)?\b",
            r"\bemsal\b",
            r"\biçtihat",
            r"\b(?:case|precedent|ruling|court\s{1,3}decision)s?\b",
        ],
    ),
    (
        Intent::ExplainConcept,
        &[
            r"\bnedir\b",
            r"\bne\s{1,3}demek",
            r"\bne\s{1,3}anlama\s{1,3}gel",
            r"\banlamı\b",
            r"\btanım",
            r"\b(?:what\s{1,3}is|meaning\s{1,3}of|define|explain)\b",
        ],
    ),
    (
        Intent::Compare,
        &[
            r"\bfark(?:ı|lar|ları|ı\s{1,3}ne)?\b",
            r"\bkarşılaştır",
            r"\barasındaki\b",
            r"\bvs\.?(?:\s|$)",
            r"\b(?:compare|difference|versus)\b",
        ],
    ),
    (
        Intent::Procedure,
        &[
            r"\bnasıl\b",
            r"\bsüreç",
            r"\bprosedür",
            r"\başama",
            r"\bbaşvuru",
            r"\bdava\s{1,3}aç",
            r"\b(?:how\s{1,3}to|procedure|steps|process)\b",
        ],
    ),
];

/// Year followed by a "since / and after" marker.
const YEAR_START_PATTERNS: &[&str] = &[
    r"\b(\d{4})(?:'?\p{L}{0,6})?(?:\s{1,3}(?:yılı|yılından|yılında|tarihinden|tarihi))?\s{1,3}(?:ve\s{1,3})?(?:sonrası|sonra|itibaren|beri)\b",
    r"\b(\d{4})\s{1,3}(?:and\s{1,3}after|and\s{1,3}later|onwards)\b",
    r"\b(?:since|after)\s{1,3}(\d{4})\b",
];

/// Year followed by a "before / until" marker.
const YEAR_END_PATTERNS: &[&str] = &[
    r"\b(\d{4})(?:'?\p{L}{0,6})?(?:\s{1,3}(?:yılı|yılından|yılına|tarihinden|tarihine))?\s{1,3}(?:öncesi|önce|kadar)\b",
    r"\b(?:before|until|prior\s{1,3}to)\s{1,3}(\d{4})\b",
];

/// Inclusive year bounds detected in a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: Option<u16>,
    pub end: Option<u16>,
}

/// Advisory filters. The retriever does not enforce them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilters {
    pub courts: Vec<String>,
    pub law_numbers: Vec<String>,
    pub year_range: Option<YearRange>,
}

/// Structured form of a raw query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub original_query: String,
    pub intent: Intent,
    pub entities: Vec<Entity>,
    /// Original query first, deduplicated, at most [`MAX_EXPANSIONS`].
    pub expanded_queries: Vec<String>,
    /// Case-folded content words in first-seen order.
    pub keywords: Vec<String>,
    pub filters: QueryFilters,
}

impl QueryAnalysis {
    pub fn has_entity(&self, kind: EntityKind) -> bool {
        self.entities.iter().any(|e| e.kind == kind)
    }
}

/// Turns raw query strings into [`QueryAnalysis`] values.
///
/// # Examples
///
/// ```
/// use docket::{
///     config::PipelineConfig,
///     query::{Intent, QueryAnalyzer},
/// };
///
/// let analyzer = QueryAnalyzer::new(&PipelineConfig::default()).unwrap();
/// let analysis = analyzer.analyze("4857 sayılı İş Kanunu madde 17 nedir");
/// assert_eq!(analysis.intent, Intent::FindLaw);
/// assert_eq!(analysis.expanded_queries[0], analysis.original_query);
/// ```
#[derive(Debug, Clone)]
pub struct QueryAnalyzer {
    intents: Vec<(Intent, Vec<Regex>)>,
    year_start: Vec<Regex>,
    year_end: Vec<Regex>,
    extractor: EntityExtractor,
    keywords: KeywordExtractor,
    synonyms: BTreeMap<String, Vec<String>>,
}

/// Compile patterns written in Turkish lowercase so they match the folded
/// query, where dotless `ı` has become `i`.
fn compile_all(patterns: &[&str]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(&p.replace('ı', "i")).map_err(Into::into))
        .collect()
}

impl QueryAnalyzer {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let intents = INTENT_PATTERNS
            .iter()
            .map(|(intent, patterns)| Ok((*intent, compile_all(patterns)?)))
            .collect::<Result<Vec<_>>>()?;

        let synonyms = config
            .synonyms
            .iter()
            .map(|(word, syns)| (fold_case(word), syns.clone()))
            .collect();

        Ok(Self {
            intents,
            year_start: compile_all(YEAR_START_PATTERNS)?,
            year_end: compile_all(YEAR_END_PATTERNS)?,
            extractor: EntityExtractor::query(),
            keywords: KeywordExtractor::new(config.stop_words.iter().cloned()),
            synonyms,
        })
    }

    pub fn analyze(&self, query: &str) -> QueryAnalysis {
        let folded = fold_case(query);
        let intent = self.detect_intent(&folded);
        let entities = self.extractor.extract(query);
        let keywords = self.keywords.extract(query);
        let expanded_queries =
            self.expand(query, intent, &entities, &keywords);
        let filters = self.filters(&folded, &entities);

        tracing::debug!(
            %intent,
            entities = entities.len(),
            keywords = keywords.len(),
            expansions = expanded_queries.len(),
            "analyzed query"
        );

        QueryAnalysis {
            original_query: query.to_string(),
            intent,
            entities,
            expanded_queries,
            keywords,
            filters,
        }
    }

    /// First intent in priority order with a matching pattern.
    pub fn detect_intent(&self, folded_query: &str) -> Intent {
        self.intents
            .iter()
            .find(|(_, patterns)| {
                patterns.iter().any(|re| re.is_match(folded_query))
            })
            .map_or(Intent::General, |(intent, _)| *intent)
    }

    fn expand(
        &self,
        query: &str,
        intent: Intent,
        entities: &[Entity],
        keywords: &[String],
    ) -> Vec<String> {
        let mut expanded = vec![query.to_string()];
        let mut push = |candidate: String| {
            if !expanded.contains(&candidate) {
                expanded.push(candidate);
            }
        };

        for keyword in keywords {
            let Some(synonyms) = self.synonyms.get(&fold_case(keyword)) else {
                continue;
            };
            for synonym in synonyms {
                if let Some(variant) = replace_word(query, keyword, synonym) {
                    push(variant);
                }
            }
        }

        let has_law = entities.iter().any(|e| e.kind == EntityKind::LawCitation);
        match intent {
            Intent::FindCase if has_law => {
                push(format!("{} {CASE_SUFFIX}", query.trim()));
            }
            Intent::FindLaw => push(format!("{} {LAW_SUFFIX}", query.trim())),
            _ => {}
        }

        expanded.truncate(MAX_EXPANSIONS);
        expanded
    }

    fn filters(&self, folded_query: &str, entities: &[Entity]) -> QueryFilters {
        let mut filters = QueryFilters::default();

        for entity in entities {
            match entity.kind {
                EntityKind::Court => {
                    if !filters.courts.contains(&entity.value) {
                        filters.courts.push(entity.value.clone());
                    }
                }
                EntityKind::LawCitation => {
                    let number: String = entity
                        .value
                        .chars()
                        .take_while(char::is_ascii_digit)
                        .collect();
                    if !number.is_empty() && !filters.law_numbers.contains(&number)
                    {
                        filters.law_numbers.push(number);
                    }
                }
                _ => {}
            }
        }

        let start = first_year(&self.year_start, folded_query);
        let end = first_year(&self.year_end, folded_query);
        if start.is_some() || end.is_some() {
            filters.year_range = Some(YearRange { start, end });
        }

        filters
    }
}

/// First accepted year captured by any of `patterns`.
fn first_year(patterns: &[Regex], text: &str) -> Option<u16> {
    patterns.iter().find_map(|re| {
        re.captures_iter(text).find_map(|caps| {
            caps.get(1)?
                .as_str()
                .parse::<u16>()
                .ok()
                .filter(|year| (MIN_YEAR..MAX_YEAR).contains(year))
        })
    })
}
