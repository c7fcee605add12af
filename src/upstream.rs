use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use crate::config::Config;
use crate::models::{AnswerRequest, RetrieveRequest};

const USER_AGENT: &str = "researcher-api/1.0";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream returned status {0}")]
    Status(StatusCode),
    #[error("{0}")]
    Transport(String),
    #[error("could not decode upstream response: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Failures that only cost us the current link.
    pub fn is_skippable(&self) -> bool {
        matches!(self, UpstreamError::Status(_) | UpstreamError::Transport(_))
    }
}

// ── Collaborator seam ────────────────────────────────────────────────────────

/// The two external services the orchestrator talks to.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// The retriever's `content` for `url`, of whatever JSON type it sent.
    /// `Ok(None)` when the reply carried no `content` at all.
    async fn retrieve(&self, url: &str) -> Result<Option<Value>, UpstreamError>;

    /// Raw answer blob for `questions` against `context`.
    async fn answer(
        &self,
        context: Option<&Value>,
        questions: &[String],
    ) -> Result<String, UpstreamError>;
}

// ── HTTP implementation ──────────────────────────────────────────────────────

pub struct HttpUpstream {
    client: reqwest::Client,
    retriever_url: Url,
    answerer_url: Url,
}

impl HttpUpstream {
    pub fn new(config: &Config) -> Result<Self, UpstreamError> {
        let mut builder = reqwest::ClientBuilder::new()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT);

        if config.insecure_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            retriever_url: config.retriever_url.clone(),
            answerer_url: config.answerer_url.clone(),
        })
    }

    async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        url: &Url,
        body: &T,
    ) -> Result<reqwest::Response, UpstreamError> {
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status()));
        }
        Ok(response)
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn retrieve(&self, url: &str) -> Result<Option<Value>, UpstreamError> {
        let response = self
            .post_json(&self.retriever_url, &RetrieveRequest { url })
            .await?;

        let body = response.text().await.map_err(transport_error)?;
        let parsed: Value =
            serde_json::from_str(&body).map_err(|e| UpstreamError::Decode(e.to_string()))?;
        // No shape checks beyond this: a `null` body has nothing to look into,
        // anything else just may or may not carry `content`.
        if parsed.is_null() {
            return Err(UpstreamError::Decode("retriever returned null".to_string()));
        }
        Ok(parsed.get("content").cloned())
    }

    async fn answer(
        &self,
        context: Option<&Value>,
        questions: &[String],
    ) -> Result<String, UpstreamError> {
        let response = self
            .post_json(&self.answerer_url, &AnswerRequest { context, questions })
            .await?;

        response.text().await.map_err(transport_error)
    }
}

fn transport_error(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Transport(format!("TimeoutError: {}", e))
    } else if e.is_connect() {
        UpstreamError::Transport(format!("ConnectError: {}", e))
    } else {
        UpstreamError::Transport(format!("RequestError: {}", e))
    }
}
