use std::time::Duration as StdDuration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::normalize::normalize;
use super::types::{CardStackRequest, MerchantSearchResult};
use crate::retry::{backoff_jitter, request_jitter, retryable_status, RetryPolicy};
use crate::types::{GeoPoint, ProviderAttempt};

const SEARCH_URL: &str = "https://marketplace.ifood.com.br/v2/cardstack/search/results";
const SITE_URL: &str = "https://www.ifood.com.br";
const SEARCH_ALIAS: &str = "SEARCH_RESULTS_MERCHANT_TAB_GLOBAL";
const CHANNEL: &str = "IFOOD";
const DESKTOP_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36";
const CLIENT_APPLICATION_KEY: &str = "41a266ee-51b7-4c37-9e9d-5cd331f280d5";
const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(15);
const CHAIN_BUDGET: StdDuration = StdDuration::from_secs(45);

#[derive(Debug, Clone, Error)]
pub enum StrategyError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("unexpected status code: {0}")]
    Status(StatusCode),
    #[error("failed to decode search payload: {0}")]
    Decode(String),
}

/// One concrete technique for querying the marketplace search endpoint.
/// Strategies are interchangeable and tried in a fixed fallback order.
#[async_trait]
pub trait SearchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(
        &self,
        term: &str,
        location: GeoPoint,
        limit: usize,
    ) -> Result<Value, StrategyError>;
}

fn search_params(term: &str, location: GeoPoint, limit: usize) -> Vec<(&'static str, String)> {
    vec![
        ("alias", SEARCH_ALIAS.to_string()),
        ("latitude", location.latitude.to_string()),
        ("longitude", location.longitude.to_string()),
        ("channel", CHANNEL.to_string()),
        ("size", limit.to_string()),
        ("term", term.to_string()),
    ]
}

async fn execute_with_retry<F>(policy: &RetryPolicy, build: F) -> Result<Value, StrategyError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 1;
    loop {
        let outcome = build().send().await;
        match outcome {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response
                        .json::<Value>()
                        .await
                        .map_err(|error| StrategyError::Decode(error.to_string()));
                }
                if !retryable_status(status.as_u16()) || !policy.attempts_left(attempt) {
                    return Err(StrategyError::Status(status));
                }
                debug!(status = %status, attempt, "retryable upstream status; backing off");
            }
            Err(error) => {
                if !policy.attempts_left(attempt) {
                    return Err(StrategyError::Http(error.to_string()));
                }
                debug!(error = %error, attempt, "request error; backing off");
            }
        }
        tokio::time::sleep(policy.delay_for(attempt) + backoff_jitter()).await;
        attempt += 1;
    }
}

/// Single POST against the card-stack endpoint with the full desktop
/// browser profile and generated device/session identifiers.
#[derive(Debug)]
pub struct DirectApiStrategy {
    http: Client,
    policy: RetryPolicy,
}

impl Default for DirectApiStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectApiStrategy {
    #[must_use]
    pub fn new() -> Self {
        let http = Client::builder()
            .user_agent(DESKTOP_UA)
            .timeout(REQUEST_TIMEOUT)
            .gzip(true)
            .build()
            .expect("failed to build reqwest client");
        Self {
            http,
            policy: RetryPolicy::default(),
        }
    }
}

#[async_trait]
impl SearchStrategy for DirectApiStrategy {
    fn name(&self) -> &'static str {
        "direct_api"
    }

    #[instrument(name = "merchant.direct_api", skip(self))]
    async fn search(
        &self,
        term: &str,
        location: GeoPoint,
        limit: usize,
    ) -> Result<Value, StrategyError> {
        let device_id = Uuid::new_v4().to_string();
        let session_id = Uuid::new_v4().to_string();
        let params = search_params(term, location, limit);
        let body = CardStackRequest::default();

        execute_with_retry(&self.policy, || {
            self.http
                .post(SEARCH_URL)
                .query(&params)
                .header("accept", "application/json, text/plain, */*")
                .header("accept-language", "pt-BR,pt;q=1")
                .header("app_version", "9.119.1")
                .header("browser", "Mac OS")
                .header("cache-control", "no-cache, no-store")
                .header("country", "BR")
                .header("gps-latitude", location.latitude.to_string())
                .header("gps-longitude", location.longitude.to_string())
                .header("origin", SITE_URL)
                .header("platform", "Desktop")
                .header("referer", format!("{SITE_URL}/"))
                .header("x-client-application-key", CLIENT_APPLICATION_KEY)
                .header("x-device-model", "Macintosh Chrome")
                .header("x-ifood-device-id", device_id.clone())
                .header("x-ifood-session-id", session_id.clone())
                .json(&body)
        })
        .await
    }
}

/// Heavyweight fallback: walks the public site first to pick up session
/// cookies the way a real browser visit would, then issues the search GET.
#[derive(Debug)]
pub struct WarmedSessionStrategy {
    http: Client,
    policy: RetryPolicy,
}

impl Default for WarmedSessionStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WarmedSessionStrategy {
    #[must_use]
    pub fn new() -> Self {
        let http = Client::builder()
            .user_agent(DESKTOP_UA)
            .timeout(REQUEST_TIMEOUT)
            .gzip(true)
            .cookie_store(true)
            .build()
            .expect("failed to build reqwest client");
        Self {
            http,
            policy: RetryPolicy::default(),
        }
    }

    /// Establish cookies by visiting the landing page and a delivery page.
    /// Returns false when the landing page itself is unreachable; a failed
    /// delivery-page probe is tolerated.
    async fn warm_up(&self, term_location: GeoPoint) -> bool {
        let Ok(landing) = self.http.get(format!("{SITE_URL}/")).send().await else {
            return false;
        };
        if !landing.status().is_success() {
            warn!(status = %landing.status(), "landing page probe rejected");
            return false;
        }

        tokio::time::sleep(request_jitter()).await;

        let delivery_pages = [
            format!("{SITE_URL}/delivery/sao-paulo-sp/vila-olimpia"),
            format!("{SITE_URL}/delivery/sao-paulo-sp"),
            format!("{SITE_URL}/delivery"),
        ];
        for page in &delivery_pages {
            match self
                .http
                .get(page)
                .header("referer", format!("{SITE_URL}/"))
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => break,
                Ok(response) => {
                    debug!(page, status = %response.status(), "delivery page probe failed");
                }
                Err(error) => debug!(page, error = %error, "delivery page probe failed"),
            }
            tokio::time::sleep(request_jitter()).await;
        }

        // A tiny throwaway query primes the search session server-side.
        let warm_params = search_params("restaurante", term_location, 1);
        if let Err(error) = self
            .http
            .get(SEARCH_URL)
            .query(&warm_params)
            .header("accept", "application/json, text/plain, */*")
            .header("x-requested-with", "XMLHttpRequest")
            .header("referer", format!("{SITE_URL}/delivery/sao-paulo-sp"))
            .send()
            .await
        {
            debug!(error = %error, "warm-up search failed; continuing");
        }
        true
    }
}

#[async_trait]
impl SearchStrategy for WarmedSessionStrategy {
    fn name(&self) -> &'static str {
        "warmed_session"
    }

    #[instrument(name = "merchant.warmed_session", skip(self))]
    async fn search(
        &self,
        term: &str,
        location: GeoPoint,
        limit: usize,
    ) -> Result<Value, StrategyError> {
        if !self.warm_up(location).await {
            return Err(StrategyError::Http(
                "session warm-up failed: landing page unreachable".to_string(),
            ));
        }

        tokio::time::sleep(request_jitter()).await;

        let params = search_params(term, location, limit);
        let referer = format!(
            "{SITE_URL}/delivery/sao-paulo-sp?q={}",
            urlencoding::encode(term)
        );
        execute_with_retry(&self.policy, || {
            self.http
                .get(SEARCH_URL)
                .query(&params)
                .header("accept", "application/json, text/plain, */*")
                .header("accept-language", "pt-BR,pt;q=0.9,en;q=0.8")
                .header("origin", SITE_URL)
                .header("referer", referer.clone())
                .header("x-requested-with", "XMLHttpRequest")
        })
        .await
    }
}

/// Lightest strategy: a plain GET with minimal headers. Slowest to produce
/// results in practice but has the fewest moving parts, so it closes the
/// fallback chain.
#[derive(Debug)]
pub struct BareSessionStrategy {
    http: Client,
    policy: RetryPolicy,
}

impl Default for BareSessionStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl BareSessionStrategy {
    #[must_use]
    pub fn new() -> Self {
        let http = Client::builder()
            .user_agent(DESKTOP_UA)
            .timeout(REQUEST_TIMEOUT)
            .gzip(true)
            .build()
            .expect("failed to build reqwest client");
        Self {
            http,
            policy: RetryPolicy::default(),
        }
    }
}

#[async_trait]
impl SearchStrategy for BareSessionStrategy {
    fn name(&self) -> &'static str {
        "bare_session"
    }

    #[instrument(name = "merchant.bare_session", skip(self))]
    async fn search(
        &self,
        term: &str,
        location: GeoPoint,
        limit: usize,
    ) -> Result<Value, StrategyError> {
        let params = search_params(term, location, limit);
        execute_with_retry(&self.policy, || {
            self.http
                .get(SEARCH_URL)
                .query(&params)
                .header("accept", "application/json, text/plain, */*")
        })
        .await
    }
}

/// Runs the strategy chain strictly in order and returns the first result
/// set with at least one merchant. Results are never merged across
/// strategies; the winning strategy's set is returned whole.
pub struct MerchantSearcher {
    strategies: Vec<Box<dyn SearchStrategy>>,
    budget: StdDuration,
}

impl std::fmt::Debug for MerchantSearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MerchantSearcher")
            .field(
                "strategies",
                &self.strategies.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("budget", &self.budget)
            .finish()
    }
}

impl Default for MerchantSearcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MerchantSearcher {
    #[must_use]
    pub fn new() -> Self {
        Self::with_strategies(vec![
            Box::new(DirectApiStrategy::new()),
            Box::new(WarmedSessionStrategy::new()),
            Box::new(BareSessionStrategy::new()),
        ])
    }

    #[must_use]
    pub fn with_strategies(strategies: Vec<Box<dyn SearchStrategy>>) -> Self {
        Self {
            strategies,
            budget: CHAIN_BUDGET,
        }
    }

    #[must_use]
    pub fn with_budget(mut self, budget: StdDuration) -> Self {
        self.budget = budget;
        self
    }

    /// Full fallback search. Never returns an error: an exhausted or
    /// timed-out chain reports `success = false` with an empty result set.
    #[instrument(name = "merchant.search", skip(self))]
    pub async fn search(
        &self,
        term: &str,
        location: GeoPoint,
        limit: usize,
    ) -> MerchantSearchResult {
        match tokio::time::timeout(self.budget, self.run_chain(term, location, limit)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(term, budget_secs = self.budget.as_secs(), "search budget exhausted");
                MerchantSearchResult::exhausted(
                    term,
                    location,
                    Some(format!(
                        "search budget of {}s exhausted",
                        self.budget.as_secs()
                    )),
                    Vec::new(),
                )
            }
        }
    }

    async fn run_chain(&self, term: &str, location: GeoPoint, limit: usize) -> MerchantSearchResult {
        let mut attempts: Vec<ProviderAttempt> = Vec::new();
        let mut last_error: Option<String> = None;

        for (index, strategy) in self.strategies.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(request_jitter()).await;
            }

            match strategy.search(term, location, limit).await {
                Ok(payload) => {
                    let restaurants = normalize(&payload);
                    attempts.push(ProviderAttempt {
                        strategy: strategy.name(),
                        succeeded: true,
                        result_count: restaurants.len(),
                    });
                    if restaurants.is_empty() {
                        debug!(
                            strategy = strategy.name(),
                            "strategy returned no merchants; falling back"
                        );
                        continue;
                    }
                    return MerchantSearchResult::found(term, location, restaurants, attempts);
                }
                Err(error) => {
                    warn!(strategy = strategy.name(), error = %error, "search strategy failed");
                    attempts.push(ProviderAttempt {
                        strategy: strategy.name(),
                        succeeded: false,
                        result_count: 0,
                    });
                    last_error = Some(error.to_string());
                }
            }
        }

        MerchantSearchResult::exhausted(term, location, last_error, attempts)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::json;

    use super::*;

    struct ScriptedStrategy {
        name: &'static str,
        outcome: Result<Value, StrategyError>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedStrategy {
        fn new(
            name: &'static str,
            outcome: Result<Value, StrategyError>,
        ) -> (Box<dyn SearchStrategy>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Box::new(Self {
                    name,
                    outcome,
                    calls: calls.clone(),
                }),
                calls,
            )
        }
    }

    #[async_trait]
    impl SearchStrategy for ScriptedStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn search(
            &self,
            _term: &str,
            _location: GeoPoint,
            _limit: usize,
        ) -> Result<Value, StrategyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn payload_with(names: &[&str]) -> Value {
        let contents: Vec<Value> = names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                json!({
                    "id": format!("merchant-{index}"),
                    "name": name,
                    "available": true,
                })
            })
            .collect();
        json!({
            "sections": [{
                "type": "CARDS",
                "cards": [{
                    "cardType": "MERCHANT_LIST_V2",
                    "data": {"contents": contents}
                }]
            }]
        })
    }

    const SP: GeoPoint = GeoPoint::new(-23.5505, -46.6333);

    #[tokio::test(start_paused = true)]
    async fn second_strategy_wins_whole_and_third_never_runs() {
        let (first, first_calls) =
            ScriptedStrategy::new("one", Err(StrategyError::Http("connect refused".into())));
        let (second, second_calls) =
            ScriptedStrategy::new("two", Ok(payload_with(&["Casa da Pizza", "Forno Mineiro"])));
        let (third, third_calls) = ScriptedStrategy::new("three", Ok(payload_with(&["Sombra"])));

        let searcher = MerchantSearcher::with_strategies(vec![first, second, third]);
        let result = searcher.search("pizza", SP, 10).await;

        assert!(result.success);
        assert_eq!(result.total_results, 2);
        assert_eq!(
            result
                .restaurants
                .iter()
                .map(|r| r.name.as_str())
                .collect::<Vec<_>>(),
            vec!["Casa da Pizza", "Forno Mineiro"]
        );
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_results_also_advance_the_chain() {
        let (first, _) = ScriptedStrategy::new("one", Ok(payload_with(&[])));
        let (second, second_calls) = ScriptedStrategy::new("two", Ok(payload_with(&["Aberto"])));

        let searcher = MerchantSearcher::with_strategies(vec![first, second]);
        let result = searcher.search("sushi", SP, 10).await;

        assert!(result.success);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.restaurants[0].name, "Aberto");
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_chain_reports_failure_with_last_error() {
        let (first, _) = ScriptedStrategy::new("one", Err(StrategyError::Http("timeout".into())));
        let (second, _) =
            ScriptedStrategy::new("two", Err(StrategyError::Http("blocked".into())));

        let searcher = MerchantSearcher::with_strategies(vec![first, second]);
        let result = searcher.search("burger", SP, 10).await;

        assert!(!result.success);
        assert!(result.restaurants.is_empty());
        assert_eq!(
            result.error.as_deref(),
            Some("HTTP request failed: blocked")
        );
        assert_eq!(result.attempts.len(), 2);
        assert!(result.attempts.iter().all(|attempt| !attempt.succeeded));
    }

    #[tokio::test(start_paused = true)]
    async fn first_sufficient_strategy_short_circuits() {
        let (first, first_calls) = ScriptedStrategy::new("one", Ok(payload_with(&["Vencedor"])));
        let (second, second_calls) = ScriptedStrategy::new("two", Ok(payload_with(&["Perdedor"])));

        let searcher = MerchantSearcher::with_strategies(vec![first, second]);
        let result = searcher.search("comida", SP, 10).await;

        assert!(result.success);
        assert_eq!(result.restaurants[0].name, "Vencedor");
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }
}
