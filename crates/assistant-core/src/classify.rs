use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use provider_client::types::GeoPoint;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use crate::state::HandlerSummary;

const CLASSIFY_TIMEOUT: StdDuration = StdDuration::from_secs(10);
const NO_MATCH_SENTINEL: &str = "none";

/// Outcome of intent classification: one handler id, or nothing suitable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Handler(String),
    NoMatch,
}

/// The contract a classifier must satisfy. The dispatcher treats any
/// implementation as a black box and tolerates ids it does not know.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(
        &self,
        text: &str,
        handlers: &[HandlerSummary],
        location: Option<GeoPoint>,
    ) -> Result<Classification>;
}

/// Deterministic keyword-based classification over the registry summaries.
/// The handler with the most keyword hits wins; ties resolve to the earlier
/// registry entry, and zero hits mean no match.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(
        &self,
        text: &str,
        handlers: &[HandlerSummary],
        _location: Option<GeoPoint>,
    ) -> Result<Classification> {
        let normalized = text.to_lowercase();
        let mut best: Option<(&HandlerSummary, usize)> = None;
        for summary in handlers {
            let hits = summary
                .keywords
                .iter()
                .filter(|keyword| normalized.contains(&keyword.to_lowercase()))
                .count();
            if hits > 0 && best.map_or(true, |(_, best_hits)| hits > best_hits) {
                best = Some((summary, hits));
            }
        }
        Ok(match best {
            Some((summary, hits)) => {
                debug!(handler = summary.id, hits, "keyword classification");
                Classification::Handler(summary.id.to_string())
            }
            None => Classification::NoMatch,
        })
    }
}

/// Classification delegated to an external language-model service. The
/// service receives the request text plus handler summaries and answers
/// with a handler id or the no-match sentinel.
#[derive(Debug)]
pub struct RemoteClassifier {
    http: Client,
    endpoint: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct RemoteDecision {
    #[serde(default)]
    agent: Option<String>,
}

impl RemoteClassifier {
    #[must_use]
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let http = Client::builder()
            .user_agent("AssistantBackend/1.0")
            .timeout(CLASSIFY_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");
        Self {
            http,
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl IntentClassifier for RemoteClassifier {
    #[instrument(name = "classify.remote", skip(self, handlers))]
    async fn classify(
        &self,
        text: &str,
        handlers: &[HandlerSummary],
        location: Option<GeoPoint>,
    ) -> Result<Classification> {
        let payload = json!({
            "model": self.model,
            "message": text,
            "location": location,
            "agents": handlers,
            "no_match": NO_MATCH_SENTINEL,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .context("classifier request failed")?;
        if !response.status().is_success() {
            anyhow::bail!("classifier returned status {}", response.status());
        }

        let decision: RemoteDecision = response
            .json()
            .await
            .context("failed to decode classifier response")?;
        Ok(match decision.agent {
            Some(agent) if !agent.is_empty() && agent != NO_MATCH_SENTINEL => {
                Classification::Handler(agent)
            }
            _ => Classification::NoMatch,
        })
    }
}
