//! docket - a lexical retrieval pipeline for legal documents.
//!
//! docket splits long statutes and court decisions into bounded, typed
//! chunks, turns free-text questions into structured queries, ranks chunks by
//! keyword and entity overlap, and packs the best of them into a context
//! string sized for a downstream text-generation step.
//!
//! # Quick start
//!
//! ```
//! use docket::{Chunker, Corpus, Pipeline, config::PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! let chunker = Chunker::new(config.chunking.clone()).unwrap();
//!
//! let corpus = Corpus::new();
//! corpus.add_document(chunker.chunk(
//!     "Madde 17 - Belirsiz süreli iş sözleşmeleri bildirimle feshedilir.",
//!     "is-kanunu",
//!     "4857 sayılı İş Kanunu",
//! ));
//!
//! let pipeline = Pipeline::new(&config).unwrap();
//! let response =
//!     pipeline.query(&corpus, "4857 sayılı İş Kanunu madde 17 nedir", 500);
//!
//! for r in &response.results {
//!     println!("{} (score: {:.3})", r.chunk.id, r.score);
//! }
//! assert!(response.context.contains("Madde 17"));
//! ```

pub mod chunking;
pub mod config;
pub mod context;
pub mod corpus;
pub mod error;
pub mod extract;
pub mod ingestion;
pub mod pipeline;
pub mod query;
pub mod reranker;
pub mod retrieval;
pub mod text_util;
pub mod walker;

pub use chunking::{Chunk, Chunker};
pub use context::ContextAssembler;
pub use corpus::Corpus;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, QueryResponse};
pub use query::{QueryAnalysis, QueryAnalyzer};
pub use reranker::Reranker;
pub use retrieval::{RetrievalResult, Retriever};
