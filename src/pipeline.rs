//! Query-time pipeline: analyze, retrieve, rerank, assemble.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};

use crate::{
    chunking::Chunk,
    config::PipelineConfig,
    context::ContextAssembler,
    corpus::Corpus,
    error::Result,
    query::{QueryAnalysis, QueryAnalyzer},
    reranker::Reranker,
    retrieval::{RetrievalResult, Retriever},
};

/// A wall-clock limit. [`Deadline::none`] never expires.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn after(budget: Duration) -> Self {
        Self(Instant::now().checked_add(budget))
    }

    pub fn expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }
}

/// Query stage, reported when a query runs out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Analyze,
    Retrieve,
    Rerank,
}

/// Whether a query ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum Completion {
    Finished,
    /// The budget ran out during `stage`; results hold what was ranked
    /// before that.
    TimedOut { stage: Stage },
}

impl Completion {
    pub fn is_finished(&self) -> bool {
        matches!(self, Completion::Finished)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub analysis: QueryAnalysis,
    pub results: Vec<RetrievalResult>,
    pub context: String,
    pub completion: Completion,
}

/// All query-time components wired together from one configuration.
///
/// # Examples
///
/// ```
/// use docket::{Chunker, Corpus, Pipeline, config::PipelineConfig};
///
/// let config = PipelineConfig::default();
/// let chunker = Chunker::new(config.chunking.clone()).unwrap();
/// let corpus = Corpus::from_chunks(chunker.chunk(
///     "Madde 25 - İşveren, işçinin sözleşmesini haklı nedenle feshedebilir.",
///     "is-kanunu",
///     "İş Kanunu",
/// ));
///
/// let pipeline = Pipeline::new(&config).unwrap();
/// let response = pipeline.query(&corpus, "haklı fesih", 1_000);
/// assert!(response.completion.is_finished());
/// assert!(response.context.starts_with("[İş Kanunu - Madde 25]"));
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    analyzer: QueryAnalyzer,
    retriever: Retriever,
    reranker: Reranker,
    assembler: ContextAssembler,
    limit: usize,
    timeout: Duration,
}

impl Pipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            analyzer: QueryAnalyzer::new(config)?,
            retriever: Retriever::new(config.weights.clone()),
            reranker: Reranker::new(config.weights.clone()),
            assembler: ContextAssembler::new(config.tokens_per_char),
            limit: config.limit,
            timeout: Duration::from_millis(config.query_timeout_ms),
        })
    }

    /// Override the per-query time budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the number of results kept per query.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn analyzer(&self) -> &QueryAnalyzer {
        &self.analyzer
    }

    /// Run a query against the current contents of `corpus`.
    pub fn query(
        &self,
        corpus: &Corpus,
        query: &str,
        max_tokens: usize,
    ) -> QueryResponse {
        let snapshot = corpus.snapshot();
        self.run(&snapshot, query, max_tokens)
    }

    /// Run a query against an explicit chunk set.
    pub fn run(
        &self,
        chunks: &[Arc<Chunk>],
        query: &str,
        max_tokens: usize,
    ) -> QueryResponse {
        let started = Instant::now();
        let deadline = Deadline::after(self.timeout);

        let analysis = self.analyzer.analyze(query);
        if deadline.expired() {
            return self.timed_out(analysis, Vec::new(), Stage::Analyze, 0);
        }

        let retrieval = self.retriever.retrieve_until(
            chunks,
            &analysis,
            self.limit,
            &deadline,
        );
        if retrieval.timed_out {
            return self.timed_out(
                analysis,
                retrieval.results,
                Stage::Retrieve,
                max_tokens,
            );
        }
        let retrieved = retrieval.results.len();

        if deadline.expired() {
            return self.timed_out(
                analysis,
                retrieval.results,
                Stage::Rerank,
                max_tokens,
            );
        }
        let results = self.reranker.rerank(retrieval.results, &analysis);

        let context = self.assembler.assemble(&results, max_tokens);
        tracing::debug!(
            corpus = chunks.len(),
            retrieved,
            context_chars = context.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query finished"
        );

        QueryResponse {
            analysis,
            results,
            context,
            completion: Completion::Finished,
        }
    }

    fn timed_out(
        &self,
        analysis: QueryAnalysis,
        results: Vec<RetrievalResult>,
        stage: Stage,
        max_tokens: usize,
    ) -> QueryResponse {
        tracing::warn!(
            ?stage,
            budget_ms = self.timeout.as_millis() as u64,
            kept = results.len(),
            "query ran out of time"
        );

        QueryResponse {
            analysis,
            context: self.assembler.assemble(&results, max_tokens),
            results,
            completion: Completion::TimedOut { stage },
        }
    }
}
