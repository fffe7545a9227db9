use std::{
    collections::{HashMap, hash_map::DefaultHasher},
    hash::{Hash, Hasher},
    path::{Path, PathBuf},
};

use rayon::prelude::*;

use crate::{
    chunking::{Chunk, Chunker},
    walker::DiscoveredFile,
};

/// Hex digits of the path hash in a fresh document id.
pub const ID_HASH_DIGITS: usize = 6;

/// Hex digits used once two documents share an id.
const ID_HASH_DIGITS_WIDE: usize = 16;

/// A document loaded from disk, ready to chunk.
#[derive(Debug, Clone)]
pub struct Document {
    /// `<slug>-<hex>`, see [`document_id`].
    pub id: String,
    pub relative_path: PathBuf,
    pub title: String,
    pub content: String,
}

/// Stable id for the document at `relative_path`: the file stem as an ASCII
/// slug, then `digits` hex digits of a hash of the whole relative path.
///
/// ```
/// use std::path::Path;
/// use docket::ingestion::document_id;
///
/// let id = document_id(Path::new("kanunlar/İş Kanunu.md"), 6);
/// assert!(id.starts_with("is-kanunu-"));
/// assert_eq!(id.len(), "is-kanunu-".len() + 6);
/// ```
pub fn document_id(relative_path: &Path, digits: usize) -> String {
    let mut hasher = DefaultHasher::new();
    relative_path.hash(&mut hasher);
    let hash = format!("{:016x}", hasher.finish());
    let hex = &hash[..digits.clamp(1, ID_HASH_DIGITS_WIDE)];

    let stem = relative_path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let slug = slug(&stem);
    if slug.is_empty() {
        hex.to_string()
    } else {
        format!("{slug}-{hex}")
    }
}

/// Lowercase ASCII slug; Turkish letters lose their diacritics and any other
/// run of non-alphanumerics becomes a single `-`.
fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let c = match c {
            'ç' | 'Ç' => 'c',
            'ğ' | 'Ğ' => 'g',
            'ı' | 'İ' => 'i',
            'ö' | 'Ö' => 'o',
            'ş' | 'Ş' => 's',
            'ü' | 'Ü' => 'u',
            c => c.to_ascii_lowercase(),
        };
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Extract a title from file content.
///
/// Looks for the first markdown heading (line starting with `# `).
/// Falls back to the filename without extension.
pub fn extract_title(content: &str, file_path: &Path) -> String {
    for line in content.lines() {
        let trimmed = line.trim();
        if let Some(heading) = trimmed.strip_prefix("# ") {
            let title = heading.trim();
            if !title.is_empty() {
                return title.to_string();
            }
        }
    }

    file_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled")
        .to_string()
}

/// Read discovered files in parallel. Unreadable files are skipped with a
/// warning; output keeps the input order.
pub fn load_documents(files: &[DiscoveredFile]) -> Vec<Document> {
    let mut documents: Vec<Document> = files
        .par_iter()
        .filter_map(|file| {
            let content = match std::fs::read_to_string(&file.absolute_path) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(
                        path = %file.absolute_path.display(),
                        error = %e,
                        "skipping unreadable document"
                    );
                    return None;
                }
            };
            let title = extract_title(&content, &file.relative_path);
            Some(Document {
                id: document_id(&file.relative_path, ID_HASH_DIGITS),
                relative_path: file.relative_path.clone(),
                title,
                content,
            })
        })
        .collect();

    disambiguate_ids(&mut documents);
    documents
}

/// Widen the hash of every document whose id collides with another's.
fn disambiguate_ids(documents: &mut [Document]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for doc in documents.iter() {
        *counts.entry(doc.id.clone()).or_default() += 1;
    }

    for doc in documents.iter_mut() {
        if counts.get(&doc.id).is_some_and(|&n| n > 1) {
            tracing::debug!(id = %doc.id, "widening colliding document id");
            doc.id = document_id(&doc.relative_path, ID_HASH_DIGITS_WIDE);
        }
    }
}

/// Chunk documents in parallel. Each document is chunked sequentially;
/// chunks come back grouped by document in input order.
pub fn chunk_documents(chunker: &Chunker, documents: &[Document]) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = documents
        .par_iter()
        .flat_map_iter(|doc| {
            chunker.chunk(&doc.content, &doc.id, &doc.title)
        })
        .collect();

    tracing::info!(
        documents = documents.len(),
        chunks = chunks.len(),
        "chunked corpus"
    );
    chunks
}
