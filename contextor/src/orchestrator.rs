//! The RAG pipeline: ingest documents, answer questions.
//!
//! Build one [`RagOrchestrator`] at startup, share it behind an `Arc`, and
//! call [`RagOrchestrator::shutdown`] before exit so the snapshot is flushed.

use std::sync::Arc;
use std::time::Instant;

use ai_llm_service::{AiLlmError, LlmServiceProfiles, config::default_config};
use rag_store::{
    Document, EmbeddingsProvider, Fragment, HashingEmbedder, IndexKind, LlmEmbedder, RagError,
    VectorIndex, chunker, normalize,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api_types::{
    GenerationParams, HealthReport, IngestReport, QaAnswer, Query, StatsReport, UsedFragment,
};
use crate::cfg::{EmbeddingBackend, LlmBackend, RagSettings};
use crate::error::ContextorError;
use crate::llm::{GenerationBackend, LiveBackend};
use crate::metrics::{MetricsSnapshot, RagMetrics};
use crate::mock::MockBackend;
use crate::retrieve::Retriever;

/// Timeout for provider health probes.
const HEALTH_TIMEOUT_SECS: u64 = 5;

pub struct RagOrchestrator {
    settings: RagSettings,
    index: Arc<dyn VectorIndex>,
    retriever: Retriever,
    backend: Arc<dyn GenerationBackend>,
    metrics: RagMetrics,
}

impl RagOrchestrator {
    /// Wires explicit collaborators.
    ///
    /// # Errors
    /// - `InvalidConfiguration` when `settings` do not validate
    /// - `ConfigurationMismatch` when `index` is not the configured variant
    pub fn new(
        settings: RagSettings,
        index: Arc<dyn VectorIndex>,
        backend: Arc<dyn GenerationBackend>,
    ) -> Result<Self, ContextorError> {
        settings.validate()?;
        let retriever = Retriever::new(
            index.clone(),
            settings.index.kind,
            settings.score_floor,
            settings.dedup_tolerance,
        )?;
        info!(
            index = %settings.index.kind,
            model = backend.model_name(),
            chunk_size = settings.chunk_size,
            overlap = settings.chunk_overlap,
            "rag orchestrator ready"
        );
        Ok(Self {
            settings,
            index,
            retriever,
            backend,
            metrics: RagMetrics::new(),
        })
    }

    /// Builds the index, embedder and generation backend named by `settings`.
    pub fn from_settings(settings: RagSettings) -> Result<Self, ContextorError> {
        let config_err = |e: AiLlmError| ContextorError::InvalidConfiguration(e.to_string());
        let dense = settings.index.kind == IndexKind::Dense;

        let svc = match settings.llm_backend {
            LlmBackend::Mock => None,
            LlmBackend::Live(provider) => {
                let generation = default_config::generation_config(provider).map_err(config_err)?;
                let embedding = if dense && settings.embedding_backend == EmbeddingBackend::Llm {
                    Some(default_config::embedding_config(provider).map_err(config_err)?)
                } else {
                    None
                };
                let svc = LlmServiceProfiles::new(generation, embedding, Some(HEALTH_TIMEOUT_SECS))
                    .map_err(config_err)?;
                Some(Arc::new(svc))
            }
        };

        let embedder: Option<Arc<dyn EmbeddingsProvider>> = match (dense, settings.embedding_backend) {
            (false, _) => None,
            (true, EmbeddingBackend::Hashing) => {
                Some(Arc::new(HashingEmbedder::new(settings.index.dim)?) as Arc<dyn EmbeddingsProvider>)
            }
            (true, EmbeddingBackend::Llm) => {
                let svc = svc.clone().ok_or_else(|| {
                    ContextorError::InvalidConfiguration(
                        "EMBEDDING_BACKEND=llm requires LLM_BACKEND=openai|ollama".into(),
                    )
                })?;
                Some(Arc::new(LlmEmbedder::new(svc)) as Arc<dyn EmbeddingsProvider>)
            }
        };

        let index = rag_store::open_index(&settings.index, embedder)?;
        let backend: Arc<dyn GenerationBackend> = match svc {
            Some(svc) => Arc::new(LiveBackend::new(svc, settings.max_ctx_chars)),
            None => Arc::new(MockBackend::new()),
        };
        Self::new(settings, index, backend)
    }

    pub fn settings(&self) -> &RagSettings {
        &self.settings
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    /// Chunks and indexes `doc`, replacing any earlier upload with the same id.
    ///
    /// Re-ingesting identical content leaves the index unchanged.
    ///
    /// # Errors
    /// - `InvalidArgument` for an empty `doc_id`
    /// - `IngestionFailed` when chunking or indexing fails; the index is untouched
    pub async fn ingest(&self, doc: Document) -> Result<IngestReport, ContextorError> {
        let started = Instant::now();
        let res = self.ingest_inner(doc).await;
        self.metrics.record_ingest(started.elapsed(), res.is_ok());
        res
    }

    async fn ingest_inner(&self, doc: Document) -> Result<IngestReport, ContextorError> {
        let doc_id = doc.doc_id.trim().to_string();
        if doc_id.is_empty() {
            return Err(ContextorError::InvalidArgument("doc_id must not be empty".into()));
        }
        let failed = |source: RagError| ContextorError::IngestionFailed {
            doc_id: doc_id.clone(),
            source,
        };

        let text = normalize::preprocess_text(&doc.text);
        let pieces = chunker::chunk(&text, self.settings.chunk_size, self.settings.chunk_overlap)
            .map_err(failed)?;
        let total = pieces.len();

        let fragments: Vec<Fragment> = pieces
            .into_iter()
            .enumerate()
            .map(|(i, piece)| {
                let mut metadata = doc.metadata.clone();
                metadata.insert("chunk_index".into(), Value::from(i));
                metadata.insert("total_chunks".into(), Value::from(total));
                Fragment {
                    doc_id: doc_id.clone(),
                    position: i,
                    text: piece,
                    metadata,
                }
            })
            .collect();

        let replaced = self.index.contains(&doc_id).await;
        let stored = self.index.add(&doc_id, fragments).await.map_err(failed)?;

        info!(doc_id = %doc_id, chunks = stored, replaced, "document ingested");
        Ok(IngestReport {
            doc_id,
            chunks_created: stored,
            replaced,
        })
    }

    /// Retrieves context and generates an answer.
    pub async fn answer(&self, query: Query) -> Result<QaAnswer, ContextorError> {
        self.answer_with_cancel(query, CancellationToken::new()).await
    }

    /// Like [`answer`](Self::answer), abandoning the request once `cancel` fires.
    ///
    /// Cancellation before dispatch is exact. After the backend call was
    /// issued it is best-effort: the call is dropped and its result discarded.
    pub async fn answer_with_cancel(
        &self,
        query: Query,
        cancel: CancellationToken,
    ) -> Result<QaAnswer, ContextorError> {
        let started = Instant::now();
        let res = self.answer_inner(query, &cancel).await;
        if let Err(e) = &res {
            warn!(error = %e, retryable = e.is_retryable(), "answer failed");
        }
        self.metrics.record_answer(started.elapsed(), res.is_ok());
        res
    }

    async fn answer_inner(
        &self,
        query: Query,
        cancel: &CancellationToken,
    ) -> Result<QaAnswer, ContextorError> {
        let question = query.question.trim();
        if question.is_empty() {
            return Err(ContextorError::InvalidArgument("question must not be empty".into()));
        }
        let params = self.resolve_params(&query)?;
        let k = query.top_k.unwrap_or(self.settings.top_k);

        if cancel.is_cancelled() {
            return Err(ContextorError::Cancelled);
        }
        let hits = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ContextorError::Cancelled),
            r = self.retriever.retrieve(question, k) => r?,
        };
        let context = hits.into_inner();
        debug!(k, fragments = context.len(), "context selected");

        if cancel.is_cancelled() {
            return Err(ContextorError::Cancelled);
        }
        let after = self.settings.generation_timeout;
        let answer = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ContextorError::Cancelled),
            r = tokio::time::timeout(after, self.backend.generate(question, &context, &params)) => match r {
                Ok(answer) => answer?,
                Err(_) => {
                    return Err(ContextorError::Timeout {
                        after,
                        retryable: self.backend.timeout_retryable(),
                    });
                }
            },
        };

        info!(
            sources = answer.sources.len(),
            tokens = answer.token_count,
            model = self.backend.model_name(),
            "question answered"
        );
        let used = answer.context_used.min(context.len());
        Ok(QaAnswer {
            answer,
            context: context[..used].iter().map(UsedFragment::from).collect(),
            model_used: self.backend.model_name().to_string(),
        })
    }

    fn resolve_params(&self, q: &Query) -> Result<GenerationParams, ContextorError> {
        let max_tokens = q.max_tokens.unwrap_or(self.settings.default_max_tokens);
        if max_tokens == 0 {
            return Err(ContextorError::InvalidArgument("max_tokens must be > 0".into()));
        }
        let temperature = q.temperature.unwrap_or(self.settings.default_temperature);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ContextorError::InvalidArgument(
                "temperature must be within 0..=2".into(),
            ));
        }
        Ok(GenerationParams {
            max_tokens,
            temperature,
        })
    }

    /// Removes every fragment of `doc_id`; returns how many were removed.
    ///
    /// # Errors
    /// `NotFound` when no fragment carries `doc_id`.
    pub async fn delete(&self, doc_id: &str) -> Result<usize, ContextorError> {
        let removed = self.index.remove(doc_id).await?;
        if removed == 0 {
            return Err(ContextorError::NotFound(doc_id.to_string()));
        }
        self.metrics.record_delete();
        info!(doc_id, removed, "document deleted");
        Ok(removed)
    }

    pub async fn stats(&self) -> StatsReport {
        StatsReport {
            index: self.index.stats().await,
            backend: self.index.kind(),
        }
    }

    /// Pings the index and the generation backend independently.
    pub async fn health(&self) -> HealthReport {
        let (index_ok, vector_store_status) = match self.index.ping().await {
            Ok(()) => (true, format!("connected ({})", self.index.kind())),
            Err(e) => (false, format!("unavailable: {e}")),
        };
        let (llm_ok, llm_status) = self.backend.health().await;
        HealthReport {
            status: if index_ok && llm_ok { "healthy" } else { "degraded" },
            version: env!("CARGO_PKG_VERSION"),
            vector_store_status,
            llm_status,
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Flushes the index snapshot. Call once before exit.
    pub async fn shutdown(&self) -> Result<(), ContextorError> {
        self.index.flush().await?;
        info!("rag orchestrator shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use rag_store::{IndexConfig, ScoredFragment, embed::EmbedFuture, open_index};

    use crate::api_types::Answer;
    use crate::mock::NOT_FOUND_ANSWER;

    const AUTH_DOC: &str =
        "Auth: use Bearer tokens in the Authorization header. Rate limit: 100/hr.";

    fn doc(id: &str, text: &str) -> Document {
        Document {
            doc_id: id.into(),
            text: text.into(),
            metadata: Default::default(),
        }
    }

    fn settings(kind: IndexKind) -> RagSettings {
        let mut s = RagSettings::new_default(kind);
        s.chunk_size = 50;
        s.chunk_overlap = 10;
        s
    }

    fn lexical_rag() -> RagOrchestrator {
        let s = settings(IndexKind::Lexical);
        let idx = open_index(&s.index, None).unwrap();
        RagOrchestrator::new(s, idx, Arc::new(MockBackend::new())).unwrap()
    }

    fn dense_rag_with(embedder: Arc<dyn EmbeddingsProvider>) -> RagOrchestrator {
        let s = settings(IndexKind::Dense);
        let idx = open_index(&s.index, Some(embedder)).unwrap();
        RagOrchestrator::new(s, idx, Arc::new(MockBackend::new())).unwrap()
    }

    fn dense_rag() -> RagOrchestrator {
        dense_rag_with(Arc::new(HashingEmbedder::new(512).unwrap()))
    }

    #[tokio::test]
    async fn authenticate_question_cites_the_auth_doc() {
        let rag = dense_rag();
        let rep = rag.ingest(doc("d1", AUTH_DOC)).await.unwrap();
        assert!(rep.chunks_created >= 2);
        assert!(!rep.replaced);

        let qa = rag.answer(Query::new("How do I authenticate?")).await.unwrap();
        assert_eq!(qa.answer.sources, vec!["d1"]);
        assert!(qa.answer.text.contains("Bearer token"));
        assert_eq!(qa.answer.token_count, 0);
        assert_eq!(qa.model_used, "mock");
        assert_eq!(qa.context[0].position, 0);
    }

    #[tokio::test]
    async fn default_lexical_setup_answers_authenticate() {
        let rag = RagOrchestrator::from_settings(settings(IndexKind::Lexical)).unwrap();
        let rep = rag.ingest(doc("d1", AUTH_DOC)).await.unwrap();
        assert_eq!(rep.chunks_created, 2);

        let qa = rag.answer(Query::new("How do I authenticate?")).await.unwrap();
        assert_eq!(qa.answer.sources, vec!["d1"]);
        assert!(qa.answer.text.contains("Bearer token"));
        assert_eq!(qa.context[0].position, 0);
    }

    #[tokio::test]
    async fn empty_index_gives_not_found_answer() {
        let rag = lexical_rag();
        let qa = rag.answer(Query::new("What is a webhook?")).await.unwrap();
        assert!(qa.answer.sources.is_empty());
        assert!(qa.context.is_empty());
        assert_eq!(qa.answer.text, NOT_FOUND_ANSWER);
    }

    #[tokio::test]
    async fn reingest_is_idempotent_and_replaces() {
        let rag = lexical_rag();
        rag.ingest(doc("d1", AUTH_DOC)).await.unwrap();
        let before = rag.stats().await;

        let again = rag.ingest(doc("d1", AUTH_DOC)).await.unwrap();
        assert!(again.replaced);
        assert_eq!(rag.stats().await, before);

        rag.ingest(doc("d1", "Webhooks are signed with HMAC.")).await.unwrap();
        let stats = rag.stats().await;
        assert_eq!(stats.index.document_count, 1);
        assert_eq!(stats.index.fragment_count, 1);
        let qa = rag.answer(Query::new("Bearer Authorization header")).await.unwrap();
        assert!(qa.answer.sources.is_empty());
    }

    #[tokio::test]
    async fn whitespace_upload_clears_the_document() {
        let rag = lexical_rag();
        rag.ingest(doc("d1", AUTH_DOC)).await.unwrap();
        let rep = rag.ingest(doc("d1", "  \n\t ")).await.unwrap();
        assert_eq!(rep.chunks_created, 0);
        assert_eq!(rag.stats().await.index.fragment_count, 0);
        assert!(matches!(
            rag.ingest(doc(" ", "text")).await,
            Err(ContextorError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn fragments_carry_chunk_metadata() {
        let s = settings(IndexKind::Lexical);
        let idx = open_index(&s.index, None).unwrap();
        let rag = RagOrchestrator::new(s, idx.clone(), Arc::new(MockBackend::new())).unwrap();

        let mut d = doc("d1", AUTH_DOC);
        d.metadata.insert("title".into(), Value::from("Auth guide"));
        let rep = rag.ingest(d).await.unwrap();

        let q = idx.vectorize("Bearer").await.unwrap();
        let hits = idx.search(&q, 10).await.unwrap();
        let m = &hits.hits()[0].fragment.metadata;
        assert_eq!(m["title"], Value::from("Auth guide"));
        assert_eq!(m["total_chunks"], Value::from(rep.chunks_created));
        assert!(m.contains_key("chunk_index"));
    }

    #[tokio::test]
    async fn delete_unknown_is_not_found() {
        let rag = lexical_rag();
        rag.ingest(doc("d1", AUTH_DOC)).await.unwrap();
        assert!(matches!(rag.delete("nope").await, Err(ContextorError::NotFound(_))));
        assert!(rag.delete("d1").await.unwrap() >= 2);
        assert_eq!(rag.stats().await.index.fragment_count, 0);
        assert_eq!(rag.metrics().documents_deleted, 1);
    }

    #[tokio::test]
    async fn invalid_generation_params_are_rejected() {
        let rag = lexical_rag();
        let mut q = Query::new("How do I paginate?");
        q.temperature = Some(2.5);
        assert!(matches!(rag.answer(q).await, Err(ContextorError::InvalidArgument(_))));

        let mut q = Query::new("How do I paginate?");
        q.max_tokens = Some(0);
        assert!(matches!(rag.answer(q).await, Err(ContextorError::InvalidArgument(_))));

        let mut q = Query::new("How do I paginate?");
        q.top_k = Some(0);
        assert!(matches!(rag.answer(q).await, Err(ContextorError::InvalidArgument(_))));
        assert_eq!(rag.metrics().answer_failures, 3);
    }

    #[test]
    fn index_kind_must_match_settings() {
        let s = settings(IndexKind::Dense);
        let idx = open_index(&IndexConfig::new_default(IndexKind::Lexical), None).unwrap();
        let err = RagOrchestrator::new(s, idx, Arc::new(MockBackend::new())).err().unwrap();
        assert!(matches!(err, ContextorError::ConfigurationMismatch(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_dense_ingests_all_land() {
        let rag = Arc::new(dense_rag());
        let mut tasks = Vec::new();
        for i in 0..16 {
            let rag = rag.clone();
            tasks.push(tokio::spawn(async move {
                rag.ingest(doc(&format!("doc-{i}"), &format!("Endpoint {i} returns JSON.")))
                    .await
            }));
        }
        for t in tasks {
            t.await.unwrap().unwrap();
        }
        let stats = rag.stats().await;
        assert_eq!(stats.index.document_count, 16);
        assert_eq!(rag.metrics().documents_ingested, 16);
    }

    /// Hashing embedder that refuses texts containing "boom".
    struct Picky(HashingEmbedder);

    impl EmbeddingsProvider for Picky {
        fn name(&self) -> &str {
            "picky"
        }
        fn embed<'a>(&'a self, text: &'a str) -> EmbedFuture<'a> {
            if text.contains("boom") {
                Box::pin(async {
                    Err(RagError::Provider {
                        class: ai_llm_service::FailureClass::RateLimited,
                        message: "429".into(),
                    })
                })
            } else {
                self.0.embed(text)
            }
        }
    }

    #[tokio::test]
    async fn failed_ingest_leaves_previous_version() {
        let rag = dense_rag_with(Arc::new(Picky(HashingEmbedder::new(512).unwrap())));
        rag.ingest(doc("d1", AUTH_DOC)).await.unwrap();
        let before = rag.stats().await;

        let err = rag.ingest(doc("d1", "this upload goes boom")).await.unwrap_err();
        assert!(matches!(err, ContextorError::IngestionFailed { ref doc_id, .. } if doc_id == "d1"));
        assert!(err.is_retryable());
        assert_eq!(rag.stats().await, before);

        let qa = rag.answer(Query::new("How do I authenticate?")).await.unwrap();
        assert_eq!(qa.answer.sources, vec!["d1"]);
        assert_eq!(rag.metrics().ingest_failures, 1);
    }

    /// Backend that sleeps before answering.
    struct Slow {
        delay: Duration,
        retryable: bool,
        called: AtomicBool,
    }

    #[async_trait]
    impl GenerationBackend for Slow {
        fn model_name(&self) -> &str {
            "slow"
        }
        async fn generate(
            &self,
            _question: &str,
            _context: &[ScoredFragment],
            _params: &GenerationParams,
        ) -> Result<Answer, ContextorError> {
            self.called.store(true, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(Answer {
                text: "late".into(),
                sources: vec![],
                token_count: 1,
                context_used: 0,
            })
        }
        async fn health(&self) -> (bool, String) {
            (false, "slow".into())
        }
        fn timeout_retryable(&self) -> bool {
            self.retryable
        }
    }

    fn slow_rag(retryable: bool) -> (RagOrchestrator, Arc<Slow>) {
        let mut s = settings(IndexKind::Lexical);
        s.generation_timeout = Duration::from_millis(100);
        let idx = open_index(&s.index, None).unwrap();
        let be = Arc::new(Slow {
            delay: Duration::from_secs(10),
            retryable,
            called: AtomicBool::new(false),
        });
        let rag = RagOrchestrator::new(s, idx, be.clone()).unwrap();
        (rag, be)
    }

    #[tokio::test(start_paused = true)]
    async fn generation_timeout_follows_backend_retryability() {
        let (rag, _) = slow_rag(true);
        let err = rag.answer(Query::new("What is a token?")).await.unwrap_err();
        assert!(matches!(err, ContextorError::Timeout { retryable: true, .. }));

        let (rag, _) = slow_rag(false);
        let err = rag.answer(Query::new("What is a token?")).await.unwrap_err();
        assert!(matches!(err, ContextorError::Timeout { retryable: false, .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_before_and_during_generation() {
        let (rag, be) = slow_rag(true);
        let token = CancellationToken::new();
        token.cancel();
        let err = rag
            .answer_with_cancel(Query::new("What is a token?"), token)
            .await
            .unwrap_err();
        assert!(matches!(err, ContextorError::Cancelled));
        assert!(!be.called.load(Ordering::SeqCst));

        let (mut rag, be) = slow_rag(true);
        rag.settings.generation_timeout = Duration::from_secs(60);
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });
        let err = rag
            .answer_with_cancel(Query::new("What is a token?"), token)
            .await
            .unwrap_err();
        assert!(matches!(err, ContextorError::Cancelled));
        assert!(be.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn health_reports_degraded_backend() {
        let (rag, _) = slow_rag(true);
        let h = rag.health().await;
        assert_eq!(h.status, "degraded");
        assert!(h.vector_store_status.starts_with("connected"));

        let h = lexical_rag().health().await;
        assert_eq!(h.status, "healthy");
    }

    #[tokio::test]
    async fn shutdown_flushes_snapshot_for_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = settings(IndexKind::Lexical);
        s.index.store_dir = Some(dir.path().to_path_buf());

        let rag = RagOrchestrator::from_settings(s.clone()).unwrap();
        rag.ingest(doc("d1", AUTH_DOC)).await.unwrap();
        let first = rag.answer(Query::new("Bearer tokens")).await.unwrap();
        rag.shutdown().await.unwrap();
        drop(rag);

        let reopened = RagOrchestrator::from_settings(s).unwrap();
        let second = reopened.answer(Query::new("Bearer tokens")).await.unwrap();
        assert_eq!(first.context, second.context);
        assert_eq!(first.answer, second.answer);
    }
}
