//! Deterministic offline backend.
//!
//! Answers are shaped by a coarse question class and quote the top-ranked
//! fragment verbatim. No network, no randomness, zero token usage.

use async_trait::async_trait;
use rag_store::ScoredFragment;

use crate::api_types::{Answer, GenerationParams, sources_of};
use crate::error::ContextorError;
use crate::llm::GenerationBackend;

pub const MOCK_MODEL: &str = "mock";

pub const NOT_FOUND_ANSWER: &str = "I couldn't find relevant information in the documentation to answer your question. Please ensure documentation has been uploaded or try rephrasing your question.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QuestionKind {
    HowTo,
    WhatIs,
    List,
    General,
}

fn classify(question: &str) -> QuestionKind {
    let q = question.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| q.contains(n));

    if has(&["how do i", "how to", "how can i", "how does"]) {
        QuestionKind::HowTo
    } else if has(&["what is", "what are", "what does"]) {
        QuestionKind::WhatIs
    } else if has(&["list", "show me"]) {
        QuestionKind::List
    } else {
        QuestionKind::General
    }
}

fn render(kind: QuestionKind, question: &str, info: &str) -> String {
    match kind {
        QuestionKind::HowTo => format!(
            "To accomplish this, according to the documentation: {info} This provides the steps needed to answer: \"{question}\" Make sure to follow the authentication and rate limiting guidelines mentioned in the API documentation."
        ),
        QuestionKind::WhatIs => format!(
            "Based on the API documentation: {info} This explains the concept you asked about. For implementation details and examples, refer to the complete documentation."
        ),
        QuestionKind::List => format!(
            "According to the documentation, here are the relevant details: {info} These are the key points that address your question: \"{question}\" Check the full API reference for additional options and parameters."
        ),
        QuestionKind::General => format!(
            "Based on the API documentation: {info} This information directly addresses your question. For more detailed information or code examples, please consult the complete API documentation. Note: This is a demonstration of the RAG system's retrieval capabilities. In production with a full LLM, responses would be more detailed and contextual."
        ),
    }
}

#[derive(Clone, Debug, Default)]
pub struct MockBackend;

impl MockBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    fn model_name(&self) -> &str {
        MOCK_MODEL
    }

    async fn generate(
        &self,
        question: &str,
        context: &[ScoredFragment],
        _params: &GenerationParams,
    ) -> Result<Answer, ContextorError> {
        let text = match context.first() {
            None => NOT_FOUND_ANSWER.to_string(),
            Some(top) => render(classify(question), question.trim(), top.fragment.text.trim()),
        };
        Ok(Answer {
            text,
            sources: sources_of(context),
            token_count: 0,
            context_used: context.len(),
        })
    }

    async fn health(&self) -> (bool, String) {
        (true, "mock backend ready".into())
    }

    fn timeout_retryable(&self) -> bool {
        false
    }
}
