//! Case folding, occurrence counting and excerpt helpers shared by the
//! extractor, retriever and reranker.
//!
//! Two lowercase forms exist. [`to_lower`] follows Turkish rules (`I` to `ı`,
//! `İ` to `i`) and is what users see in keywords and entity values.
//! [`fold_case`] is the comparison form: it also merges dotted and dotless
//! `i`, so `YARGITAY`, `Yargıtay` and `yargitay` all compare equal. Every
//! case-insensitive comparison in the crate folds both sides.

/// Maximum number of characters in a highlight, excluding ellipses.
pub const HIGHLIGHT_MAX_CHARS: usize = 120;

/// Ellipsis marker for truncated highlights.
const ELLIPSIS: &str = "...";

fn lower_char(c: char, out: &mut String) {
    match c {
        'İ' => out.push('i'),
        'I' => out.push('ı'),
        c => out.extend(c.to_lowercase()),
    }
}

fn fold_char(c: char, out: &mut String) {
    match c {
        'I' | 'İ' | 'ı' => out.push('i'),
        c => out.extend(c.to_lowercase()),
    }
}

/// Turkish lowercase of `text`.
///
/// # Examples
///
/// ```
/// use docket::text_util::to_lower;
///
/// assert_eq!(to_lower("YARGITAY İÇTİHADI"), "yargıtay içtihadı");
/// ```
pub fn to_lower(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        lower_char(c, &mut out);
    }
    out
}

/// Fold `text` to the form every comparison in the pipeline expects.
///
/// # Examples
///
/// ```
/// use docket::text_util::fold_case;
///
/// assert_eq!(fold_case("İş Kanunu"), "iş kanunu");
/// assert_eq!(fold_case("MADDE 17"), "madde 17");
/// assert_eq!(fold_case("YARGITAY"), fold_case("yargıtay"));
/// ```
pub fn fold_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        fold_char(c, &mut out);
    }
    out
}

/// Case-folded copy of a text that remembers where each folded byte came
/// from, so matches found in the folded form can be cut from the original.
#[derive(Debug, Clone)]
pub struct FoldedText {
    folded: String,
    /// `origin[i]` is the original byte offset of folded byte `i`; the last
    /// entry is the original length.
    origin: Vec<usize>,
}

impl FoldedText {
    pub fn new(text: &str) -> Self {
        let mut folded = String::with_capacity(text.len());
        let mut origin = Vec::with_capacity(text.len() + 1);

        for (byte_idx, c) in text.char_indices() {
            let before = folded.len();
            fold_char(c, &mut folded);
            origin.extend(std::iter::repeat_n(byte_idx, folded.len() - before));
        }
        origin.push(text.len());

        Self { folded, origin }
    }

    pub fn as_str(&self) -> &str {
        &self.folded
    }

    /// Map a byte offset in the folded text back to the original text.
    pub fn original_offset(&self, folded_offset: usize) -> usize {
        self.origin[folded_offset.min(self.origin.len() - 1)]
    }

    /// Byte ranges (in the original text) of whole-word occurrences of an
    /// already-folded `word`.
    pub fn word_ranges(&self, word: &str) -> Vec<(usize, usize)> {
        if word.is_empty() {
            return Vec::new();
        }

        self.folded
            .match_indices(word)
            .filter(|&(start, matched)| {
                let end = start + matched.len();
                let before = self.folded[..start].chars().next_back();
                let after = self.folded[end..].chars().next();
                !before.is_some_and(char::is_alphanumeric)
                    && !after.is_some_and(char::is_alphanumeric)
            })
            .map(|(start, matched)| {
                (
                    self.original_offset(start),
                    self.original_offset(start + matched.len()),
                )
            })
            .collect()
    }
}

/// Split text into lowercase alphanumeric words.
pub fn words(text: &str) -> Vec<String> {
    to_lower(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Count non-overlapping occurrences of a folded `needle` in a folded
/// `haystack`. An empty needle never matches.
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// Replace every whole-word, case-insensitive occurrence of `word` in `text`.
///
/// Returns `None` when `word` does not occur, so callers can tell a no-op
/// apart from a substitution that happens to produce the same string.
///
/// # Examples
///
/// ```
/// use docket::text_util::replace_word;
///
/// let out = replace_word("İşçi haklarını işçi bilir", "işçi", "çalışan");
/// assert_eq!(out.as_deref(), Some("çalışan haklarını çalışan bilir"));
/// assert_eq!(replace_word("işçiler", "işçi", "çalışan"), None);
/// ```
pub fn replace_word(text: &str, word: &str, replacement: &str) -> Option<String> {
    let folded = FoldedText::new(text);
    let ranges = folded.word_ranges(&fold_case(word));
    if ranges.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, end) in ranges {
        out.push_str(&text[last..start]);
        out.push_str(replacement);
        last = end;
    }
    out.push_str(&text[last..]);
    Some(out)
}

/// Cut an excerpt of `text` centered on the first occurrence of the folded
/// `keyword`, at most [`HIGHLIGHT_MAX_CHARS`] characters plus ellipses.
///
/// Whitespace runs inside the excerpt are collapsed to single spaces.
/// Returns `None` when the keyword does not occur.
pub fn highlight(text: &str, folded: &FoldedText, keyword: &str) -> Option<String> {
    if keyword.is_empty() {
        return None;
    }
    let folded_start = folded.as_str().find(keyword)?;
    let start_byte = folded.original_offset(folded_start);
    let end_byte = folded.original_offset(folded_start + keyword.len());

    let match_start = text[..start_byte].chars().count();
    let match_len = text[start_byte..end_byte].chars().count();
    let total = match_start + text[start_byte..].chars().count();

    let side = HIGHLIGHT_MAX_CHARS.saturating_sub(match_len) / 2;
    let from = match_start.saturating_sub(side);
    let to = (match_start + match_len + side).min(total);

    let excerpt: String = text.chars().skip(from).take(to - from).collect();
    let mut snippet = excerpt.split_whitespace().collect::<Vec<_>>().join(" ");

    if from > 0 {
        snippet.insert_str(0, ELLIPSIS);
    }
    if to < total {
        snippet.push_str(ELLIPSIS);
    }

    Some(snippet)
}
