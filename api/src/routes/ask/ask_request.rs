use contextor::UsedFragment;
use serde::{Deserialize, Serialize};

/// Shortest question accepted.
pub const MIN_QUESTION_CHARS: usize = 5;

/// Request payload for `POST /ask`.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    /// Natural language question.
    pub question: String,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Optional override of the configured number of context fragments.
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl AskRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.question.trim().chars().count() < MIN_QUESTION_CHARS {
            return Err(format!("question must be at least {MIN_QUESTION_CHARS} characters"));
        }
        if self.max_tokens == Some(0) {
            return Err("max_tokens must be > 0".into());
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err("temperature must be within 0..=2".into());
            }
        }
        if self.top_k == Some(0) {
            return Err("top_k must be > 0".into());
        }
        Ok(())
    }
}

/// Response payload for `POST /ask`.
#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
    /// Distinct source `doc_id`s in retrieval order.
    pub sources: Vec<String>,
    /// Fragments handed to the model, with previews.
    pub context: Vec<UsedFragment>,
    pub token_count: u64,
    pub model_used: String,
    /// RFC3339 UTC.
    pub timestamp: String,
}
