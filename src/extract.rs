//! Entity and keyword extraction.
//!
//! Entities come from an ordered table of `(kind, pattern, normalizer)`
//! rules. Every pattern is compiled with the `regex` crate, whose finite
//! automata match in time linear in the input, and every repetition is
//! bounded, so adversarial documents cannot stall extraction.

use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::text_util::{fold_case, to_lower, words};

/// Minimum keyword length in characters (keywords must be longer than two).
pub const MIN_KEYWORD_CHARS: usize = 3;

/// Default stop-words, Turkish first, then the English ones users mix in.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "acaba", "ama", "ancak", "bana", "beni", "bile", "bir", "biri", "birkaç",
    "böyle", "bunu", "bunun", "buna", "çok", "daha", "değil", "diye", "gibi",
    "göre", "hangi", "hangisi", "hem", "hep", "hiç", "için", "ile", "ise",
    "kadar", "kim", "mıdır", "midir", "mudur", "müdür", "nasıl", "neden",
    "nedir", "nelerdir", "nerede", "niçin", "olan", "olarak", "olur", "sonra",
    "şey", "şöyle", "tüm", "var", "veya", "yani", "yok", "and", "are", "can",
    "does", "for", "from", "how", "into", "that", "the", "this", "was",
    "what", "when", "which", "who", "why", "with",
];

/// Entity taxonomy shared by chunk metadata and query analysis.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    LawCitation,
    Article,
    Date,
    Amount,
    CaseNumber,
    Court,
    /// Legal concept phrase; only produced by the query table.
    Concept,
}

/// One occurrence of a recognized entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    /// Normalized form used for matching against chunk text.
    pub value: String,
    /// Text exactly as it appeared in the input.
    pub text: String,
    /// Byte offsets of `text` in the input.
    pub start: usize,
    pub end: usize,
}

macro_rules! entity_pattern {
    ($name:ident, $regex_str:expr) => {
        static $name: LazyLock<Option<Regex>> =
            LazyLock::new(|| Regex::new($regex_str).ok());
    };
}

// ── Law citations ──────────────────────────────────────────────────────────
entity_pattern!(
    RE_LAW,
    r"\b\d{1,5}\s{1,3}(?i:sayılı)\s{1,3}(?:\p{L}{1,30}\s{1,3}){0,5}?\p{L}{0,30}(?i:kanunu|kanun|yönetmeliği|yönetmelik|tüzüğü|kararnamesi)\b"
);
entity_pattern!(RE_LAW_CODE, r"\b(?:TMK|TBK|TCK|CMK|HMK|İİK|TTK|İYUK|KVKK)\b");

// ── Article references ─────────────────────────────────────────────────────
entity_pattern!(
    RE_ARTICLE,
    r"(?i)\b(?:madde|md\.|m\.)\s{0,3}\d{1,4}(?:/\d{1,3})?\b"
);
entity_pattern!(RE_ARTICLE_ORDINAL, r"(?i)\b\d{1,4}\.\s{0,3}madde\b");

// ── Dates ──────────────────────────────────────────────────────────────────
entity_pattern!(
    RE_DATE,
    r"\b(?:0?[1-9]|[12]\d|3[01])[./-](?:0?[1-9]|1[0-2])[./-](?:19|20)\d{2}\b"
);
entity_pattern!(
    RE_DATE_LONG,
    r"(?i)\b(?:0?[1-9]|[12]\d|3[01])\s{1,3}(?:ocak|şubat|mart|nisan|mayıs|haziran|temmuz|ağustos|eylül|ekim|kasım|aralık)\s{1,3}(?:19|20)\d{2}\b"
);

// ── Monetary amounts ───────────────────────────────────────────────────────
entity_pattern!(
    RE_AMOUNT,
    r"\b(?:\d{1,3}(?:\.\d{3}){1,5}|\d{1,12})(?:,\d{1,2})?\s{0,2}(?:TL\b|₺|Türk Lirası\b|[Ll]ira\b|USD\b|EUR\b|€|[Dd]olar\b|[Aa]vro\b)"
);

// ── Case / docket numbers ──────────────────────────────────────────────────
entity_pattern!(
    RE_CASE_NUMBER,
    r"\b(?:19|20)\d{2}/\d{1,6}\s{0,2}(?:E\.|K\.|Esas\b|Karar\b)"
);

// ── Courts ─────────────────────────────────────────────────────────────────
entity_pattern!(
    RE_HIGH_COURT,
    r"(?i)\b(?:yarg[ıIiİ]tay|dan[ıIiİ]ştay|say[ıIiİ]ştay|anayasa\s{1,3}mahkemesi|uyuşmazlık\s{1,3}mahkemesi)(?:\s{1,3}(?:\d{1,2}\.\s{0,2}(?:hukuk\s{1,3}|ceza\s{1,3}|[İi]dari\s{1,3})?daire(?:si)?\b|hukuk\s{1,3}genel\s{1,3}kurulu\b|ceza\s{1,3}genel\s{1,3}kurulu\b))?"
);
entity_pattern!(
    RE_LOCAL_COURT,
    r"(?i)\b(?:\d{1,3}\.\s{0,2})?(?:asliye\s{1,3}hukuk|asliye\s{1,3}ceza|asliye\s{1,3}ticaret|sulh\s{1,3}hukuk|sulh\s{1,3}ceza|ağır\s{1,3}ceza|[İi]ş|[İi]dare|vergi|aile|tüketici|[İi]cra\s{1,3}hukuk|bölge\s{1,3}adliye|bölge\s{1,3}[İi]dare)\s{1,3}mahkemesi\b"
);

/// Concept phrases recognized in queries.
const LEGAL_CONCEPTS: &[&str] = &[
    "kıdem tazminatı",
    "ihbar tazminatı",
    "manevi tazminat",
    "maddi tazminat",
    "haklı fesih",
    "haksız fesih",
    "işe iade",
    "fazla mesai",
    "yıllık izin",
    "zamanaşımı",
    "hak düşürücü süre",
    "nafaka",
    "velayet",
    "boşanma",
    "miras",
    "vasiyetname",
    "tahliye",
    "kira tespit",
    "ecrimisil",
    "tapu iptali",
    "haciz",
    "itirazın iptali",
    "menfi tespit",
    "arabuluculuk",
];

static RE_CONCEPT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    let alternation = LEGAL_CONCEPTS
        .iter()
        .map(|c| regex::escape(c).replace(' ', r"\s{1,3}"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).ok()
});

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_article(s: &str) -> String {
    let number: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '/')
        .collect();
    format!("madde {number}")
}

fn normalize_lower(s: &str) -> String {
    to_lower(&collapse_whitespace(s))
}

/// Capitalize each word, Turkish style (`idare` becomes `İdare`).
fn title_case(s: &str) -> String {
    collapse_whitespace(&to_lower(s))
        .split(' ')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some('i') => format!("İ{}", chars.as_str()),
                Some(first) => {
                    first.to_uppercase().chain(chars).collect::<String>()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A single extraction rule.
#[derive(Clone)]
pub struct Rule {
    pub kind: EntityKind,
    regex: Regex,
    normalize: fn(&str) -> String,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("kind", &self.kind)
            .field("pattern", &self.regex.as_str())
            .finish()
    }
}

impl Rule {
    /// Build a rule from a caller-supplied pattern.
    pub fn new(
        kind: EntityKind,
        pattern: &str,
        normalize: fn(&str) -> String,
    ) -> crate::Result<Self> {
        Ok(Self {
            kind,
            regex: Regex::new(pattern)?,
            normalize,
        })
    }

    fn from_static(
        kind: EntityKind,
        pattern: &LazyLock<Option<Regex>>,
        normalize: fn(&str) -> String,
    ) -> Option<Self> {
        pattern.as_ref().map(|regex| Self {
            kind,
            regex: regex.clone(),
            normalize,
        })
    }
}

/// Ordered rule table. Rules run in table order and every match of every
/// rule becomes one [`Entity`]; nothing is merged.
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    rules: Vec<Rule>,
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::document()
    }
}

impl EntityExtractor {
    /// Table used for document chunks.
    pub fn document() -> Self {
        use EntityKind::*;

        let rules = [
            Rule::from_static(LawCitation, &RE_LAW, collapse_whitespace),
            Rule::from_static(LawCitation, &RE_LAW_CODE, collapse_whitespace),
            Rule::from_static(Article, &RE_ARTICLE, normalize_article),
            Rule::from_static(Article, &RE_ARTICLE_ORDINAL, normalize_article),
            Rule::from_static(Date, &RE_DATE, collapse_whitespace),
            Rule::from_static(Date, &RE_DATE_LONG, normalize_lower),
            Rule::from_static(Amount, &RE_AMOUNT, collapse_whitespace),
            Rule::from_static(CaseNumber, &RE_CASE_NUMBER, collapse_whitespace),
            Rule::from_static(Court, &RE_HIGH_COURT, title_case),
            Rule::from_static(Court, &RE_LOCAL_COURT, title_case),
        ];

        Self {
            rules: rules.into_iter().flatten().collect(),
        }
    }

    /// Document table plus the query-only concept rules.
    pub fn query() -> Self {
        let mut extractor = Self::document();
        extractor.rules.extend(Rule::from_static(
            EntityKind::Concept,
            &RE_CONCEPT,
            normalize_lower,
        ));
        extractor
    }

    /// Append a rule to the end of the table.
    pub fn push_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn extract(&self, text: &str) -> Vec<Entity> {
        let mut entities = Vec::new();
        for rule in &self.rules {
            for m in rule.regex.find_iter(text) {
                entities.push(Entity {
                    kind: rule.kind,
                    value: (rule.normalize)(m.as_str()),
                    text: m.as_str().to_string(),
                    start: m.start(),
                    end: m.end(),
                });
            }
        }
        entities
    }
}

/// Stop-word filtered keyword extraction.
#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    stop_words: HashSet<String>,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()))
    }
}

impl KeywordExtractor {
    pub fn new(stop_words: impl IntoIterator<Item = String>) -> Self {
        Self {
            stop_words: stop_words.into_iter().map(|w| fold_case(&w)).collect(),
        }
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(&fold_case(word))
    }

    /// Lowercase content words longer than two characters, stop-words
    /// removed, deduplicated in first-seen order. Words that differ only in
    /// dotted or dotless `i` count as the same word.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        words(text)
            .into_iter()
            .filter(|w| w.chars().count() >= MIN_KEYWORD_CHARS)
            .filter(|w| !self.is_stop_word(w))
            .filter(|w| seen.insert(fold_case(w)))
            .collect()
    }
}
