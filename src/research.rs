use serde_json::Value;
use tracing::{debug, info, warn};

use crate::upstream::{Upstream, UpstreamError};

/// Placeholder for a question nobody has answered yet.
pub const SENTINEL: &str = "Unknown";

const LOG_SNIPPET_LEN: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Walks `links` in order, asking the answerer about whatever is still
/// unresolved, until every question has an answer or the links run out.
///
/// Per-link failures (retrieval/answer status or transport errors, answer
/// count mismatches) skip the link. Anything else aborts the whole run.
pub async fn process(
    upstream: &dyn Upstream,
    links: &[String],
    questions: &[String],
) -> Result<Vec<String>, ResearchError> {
    info!(
        links = links.len(),
        questions = questions.len(),
        "processing research request"
    );

    let mut answers = vec![SENTINEL.to_string(); questions.len()];

    for link in links {
        let pending = unanswered_indices(&answers);
        if pending.is_empty() {
            info!("all questions answered");
            break;
        }

        info!(%link, pending = pending.len(), "checking link");

        let content = match upstream.retrieve(link).await {
            Ok(content) => content,
            Err(e) if e.is_skippable() => {
                warn!(%link, error = %e, "failed to fetch page content");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        debug!(
            %link,
            content = %truncate(&content_for_log(content.as_ref()), LOG_SNIPPET_LEN),
            "page content"
        );

        let pending_questions: Vec<String> =
            pending.iter().map(|&idx| questions[idx].clone()).collect();

        let raw = match upstream.answer(content.as_ref(), &pending_questions).await {
            Ok(raw) => raw,
            Err(e) if e.is_skippable() => {
                warn!(%link, error = %e, "failed to get answers");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        debug!(%link, response = %truncate(&raw, LOG_SNIPPET_LEN), "answerer response");

        let parsed = parse_answers(&raw);
        if parsed.len() != pending.len() {
            warn!(
                %link,
                expected = pending.len(),
                got = parsed.len(),
                "mismatch in number of answers and questions"
            );
            continue;
        }

        for (answer, &idx) in parsed.into_iter().zip(pending.iter()) {
            if answer.to_lowercase() != "unknown" {
                answers[idx] = answer;
            }
        }
        debug!(?answers, "answers so far");
    }

    Ok(answers)
}

/// Indices whose slot still holds the sentinel, in question order.
pub fn unanswered_indices(answers: &[String]) -> Vec<usize> {
    answers
        .iter()
        .enumerate()
        .filter(|(_, answer)| answer.as_str() == SENTINEL)
        .map(|(idx, _)| idx)
        .collect()
}

/// Splits an answerer reply into per-question answers.
///
/// The reply is trimmed, one pair of surrounding braces is dropped if present,
/// and the rest is split on `>`. Segments are trimmed; empty ones are kept.
pub fn parse_answers(raw: &str) -> Vec<String> {
    let mut body = raw.trim();
    if body.starts_with('{') && body.ends_with('}') {
        body = &body[1..body.len() - 1];
    }
    body.split('>').map(|segment| segment.trim().to_string()).collect()
}

fn content_for_log(content: Option<&Value>) -> String {
    match content {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
