//! Plain-language explanation generation.
//!
//! [`generate_explanation`] calls an external completion endpoint when one
//! is configured and falls back to a deterministic template on any failure
//! (missing credentials, network error, non-success response, empty
//! completion). It never returns an error: the caller always receives a
//! usable string.
//!
//! Document serving does not block on this. A timer-driven background
//! sweep ([`run_sweep_worker`]) finds documents lacking an explanation and
//! processes them in small batches with inter-call delays to respect
//! external rate limits. Re-running generation for a document simply
//! overwrites the field.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};

use crate::config::ExplainConfig;
use crate::store::BipStore;

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PROMPT: &str = "You explain Bitcoin Improvement Proposals to a general audience. \
     Summarize the proposal below in two or three plain sentences. \
     Avoid jargon; do not assume familiarity with Bitcoin internals.";

/// Characters of abstract kept in the fallback template.
const FALLBACK_ABSTRACT_CHARS: usize = 200;
/// Characters of content sent to the completion endpoint.
const COMPLETION_CONTENT_CHARS: usize = 6000;

/// Produce a short plain-language summary. Best-effort: failures are
/// absorbed here and replaced by the deterministic fallback.
pub async fn generate_explanation(
    config: &ExplainConfig,
    title: &str,
    abstract_text: &str,
    content: &str,
) -> String {
    if config.is_enabled() {
        match generate_openai(config, title, abstract_text, content).await {
            Ok(text) if !text.trim().is_empty() => return text.trim().to_string(),
            Ok(_) => tracing::debug!("empty completion, using fallback"),
            Err(e) => tracing::debug!("completion failed, using fallback: {}", e),
        }
    }
    fallback_explanation(title, abstract_text)
}

/// One attempt against the completion API. No retry: a failed document is
/// picked up again by a later sweep.
async fn generate_openai(
    config: &ExplainConfig,
    title: &str,
    abstract_text: &str,
    content: &str,
) -> Result<String> {
    let api_key =
        std::env::var("OPENAI_API_KEY").map_err(|_| anyhow!("OPENAI_API_KEY not set"))?;
    let model = config
        .model
        .as_ref()
        .ok_or_else(|| anyhow!("explain.model required"))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let head: String = content.chars().take(COMPLETION_CONTENT_CHARS).collect();
    let body = serde_json::json!({
        "model": model,
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            {
                "role": "user",
                "content": format!("Title: {}\n\nAbstract: {}\n\n{}", title, abstract_text, head),
            },
        ],
    });

    let response = client
        .post(COMPLETIONS_URL)
        .header("Authorization", format!("Bearer {}", api_key))
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        bail!("completion API error {}: {}", status, body_text);
    }

    let json: serde_json::Value = response.json().await?;
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("completion response missing content"))
}

/// Deterministic template built from the title and a truncated abstract.
/// Non-empty for any input.
pub fn fallback_explanation(title: &str, abstract_text: &str) -> String {
    let title = title.trim();
    let title = if title.is_empty() { "This proposal" } else { title };

    let trimmed = abstract_text.trim();
    if trimmed.is_empty() {
        return format!(
            "{} is a Bitcoin Improvement Proposal. A plain-language summary is not available yet.",
            title
        );
    }

    let mut summary: String = trimmed.chars().take(FALLBACK_ABSTRACT_CHARS).collect();
    if summary.len() < trimmed.len() {
        summary.push('…');
    }
    format!("{}: {}", title, summary)
}

/// Process one batch of documents lacking an explanation. Returns how many
/// documents were updated. A storage write failure stops the batch; the
/// remainder is picked up on the next sweep.
pub async fn sweep_once(config: &ExplainConfig, store: &dyn BipStore) -> Result<usize> {
    let pending: Vec<_> = store
        .get_all()
        .await?
        .into_iter()
        .filter(|b| b.explanation.is_none())
        .take(config.batch_size)
        .collect();

    let mut updated = 0usize;
    for (i, mut bip) in pending.into_iter().enumerate() {
        if i > 0 && config.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.delay_ms)).await;
        }

        let text =
            generate_explanation(config, &bip.title, &bip.abstract_text, &bip.content).await;
        bip.explanation = Some(text);

        if let Err(e) = store.patch(bip).await {
            tracing::warn!("explanation write failed, deferring to next sweep: {}", e);
            break;
        }
        updated += 1;
    }

    Ok(updated)
}

/// Timer loop around [`sweep_once`]. Runs until the process exits.
pub async fn run_sweep_worker(config: ExplainConfig, store: Arc<dyn BipStore>) {
    let mut interval = tokio::time::interval(Duration::from_millis(config.sweep_interval_ms));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        match sweep_once(&config, store.as_ref()).await {
            Ok(0) => {}
            Ok(n) => tracing::info!("explanations backfilled: {}", n),
            Err(e) => tracing::warn!("explanation sweep failed: {}", e),
        }
    }
}
