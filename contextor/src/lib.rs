//! Retrieval-augmented question answering over uploaded API documentation.
//!
//! Public entry point: [`RagOrchestrator`]. It chunks and indexes documents
//! through `rag-store`, retrieves ranked context for a question (floor +
//! adjacent-duplicate removal), and hands it to a [`GenerationBackend`]:
//! either a live provider via `ai-llm-service` or the offline [`MockBackend`].

mod api_types;
mod cfg;
mod error;
mod llm;
mod metrics;
mod mock;
mod orchestrator;
pub mod prompt;
mod retrieve;
mod select;

pub use api_types::{
    Answer, GenerationParams, HealthReport, IngestReport, PREVIEW_CHARS, QaAnswer, Query,
    StatsReport, UsedFragment, sources_of,
};
pub use cfg::{EmbeddingBackend, LlmBackend, RagSettings};
pub use error::ContextorError;
pub use llm::{GenerationBackend, LiveBackend};
pub use metrics::{MetricsSnapshot, RagMetrics};
pub use mock::{MOCK_MODEL, MockBackend, NOT_FOUND_ANSWER};
pub use orchestrator::RagOrchestrator;
pub use retrieve::Retriever;
pub use select::dedup_adjacent;

pub use ai_llm_service::FailureClass;
pub use rag_store::{Document, IndexKind, Metadata};
pub use tokio_util::sync::CancellationToken;
