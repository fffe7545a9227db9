use std::sync::{Arc, PoisonError, RwLock};

use crate::chunking::Chunk;

/// Shared, immutable view of every searchable chunk.
pub type Snapshot = Arc<Vec<Arc<Chunk>>>;

/// The searchable chunk set.
///
/// Readers take a [`Snapshot`] and keep using it for the whole query.
/// Writers build a new vector and swap the reference, so a query never sees
/// half of an update.
///
/// # Examples
///
/// ```
/// use docket::{Chunker, Corpus, config::ChunkingConfig};
///
/// let chunker = Chunker::new(ChunkingConfig::default()).unwrap();
/// let corpus = Corpus::new();
/// corpus.add_document(chunker.chunk("Madde 1 - Metin.", "a", "Kanun"));
///
/// let before = corpus.snapshot();
/// corpus.remove_document("a");
/// assert_eq!(before.len(), 1);
/// assert!(corpus.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct Corpus {
    chunks: RwLock<Snapshot>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_chunks(chunks: impl IntoIterator<Item = Chunk>) -> Self {
        Self {
            chunks: RwLock::new(Arc::new(
                chunks.into_iter().map(Arc::new).collect(),
            )),
        }
    }

    /// The current chunk set. Later updates do not affect it.
    pub fn snapshot(&self) -> Snapshot {
        self.chunks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Number of distinct documents in the corpus.
    pub fn document_count(&self) -> usize {
        let snapshot = self.snapshot();
        let mut ids: Vec<&str> = snapshot
            .iter()
            .map(|c| c.metadata.document_id.as_str())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// Add a document's chunks, replacing any chunks it already had.
    pub fn add_document(&self, chunks: Vec<Chunk>) {
        let Some(document_id) =
            chunks.first().map(|c| c.metadata.document_id.clone())
        else {
            return;
        };

        self.update(|current| {
            current
                .iter()
                .filter(|c| c.metadata.document_id != document_id)
                .cloned()
                .chain(chunks.into_iter().map(Arc::new))
                .collect()
        });
        tracing::debug!(%document_id, "document added to corpus");
    }

    /// Drop every chunk of `document_id`. Returns whether any were removed.
    pub fn remove_document(&self, document_id: &str) -> bool {
        let mut removed = false;
        self.update(|current| {
            let kept: Vec<_> = current
                .iter()
                .filter(|c| c.metadata.document_id != document_id)
                .cloned()
                .collect();
            removed = kept.len() != current.len();
            kept
        });
        removed
    }

    /// Swap in an entirely new chunk set.
    pub fn replace(&self, chunks: impl IntoIterator<Item = Chunk>) {
        let next: Vec<_> = chunks.into_iter().map(Arc::new).collect();
        self.update(|_| next);
    }

    fn update(&self, build: impl FnOnce(&[Arc<Chunk>]) -> Vec<Arc<Chunk>>) {
        let mut guard =
            self.chunks.write().unwrap_or_else(PoisonError::into_inner);
        let next = build(&guard);
        *guard = Arc::new(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{chunking::Chunker, config::ChunkingConfig};

    fn chunks(document_id: &str, text: &str) -> Vec<Chunk> {
        Chunker::new(ChunkingConfig::with_sizes(5, 40, 0))
            .unwrap()
            .chunk(text, document_id, "Belge")
    }

    #[test]
    fn add_replaces_existing_document() {
        let corpus = Corpus::new();
        corpus.add_document(chunks("a", "Birinci metin."));
        corpus.add_document(chunks("b", "İkinci metin."));
        corpus.add_document(chunks("a", "Güncel metin."));

        let snapshot = corpus.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(corpus.document_count(), 2);
        assert_eq!(snapshot[1].content, "Güncel metin.");
    }

    #[test]
    fn snapshots_are_isolated_from_updates() {
        let corpus = Corpus::from_chunks(chunks("a", "Birinci metin."));
        let before = corpus.snapshot();

        corpus.replace(chunks("b", "Yeni metin."));
        assert_eq!(before[0].metadata.document_id, "a");
        assert_eq!(corpus.snapshot()[0].metadata.document_id, "b");
    }

    #[test]
    fn remove_reports_presence() {
        let corpus = Corpus::from_chunks(chunks("a", "Birinci metin."));
        assert!(!corpus.remove_document("zzz"));
        assert!(corpus.remove_document("a"));
        assert!(corpus.is_empty());
    }

    #[test]
    fn adding_empty_document_is_noop() {
        let corpus = Corpus::new();
        corpus.add_document(Vec::new());
        assert!(corpus.is_empty());
    }
}
