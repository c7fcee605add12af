use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    pub links: Vec<String>,
    pub questions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ResearchResponse {
    pub answers: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

// ── Upstream payloads ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct RetrieveRequest<'a> {
    pub url: &'a str,
}

/// `context` is whatever the retriever put under `content`, passed through
/// untouched. Left out of the body entirely when the retriever sent none.
#[derive(Debug, Serialize)]
pub struct AnswerRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<&'a Value>,
    pub questions: &'a [String],
}
