use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use provider_client::types::GeoPoint;
use provider_client::ProviderClients;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::Mutex;

/// Immutable inbound request, constructed once per call.
#[derive(Debug, Clone, Default)]
pub struct DomainRequest {
    pub text: String,
    pub user_id: Option<String>,
    pub location: Option<GeoPoint>,
    pub auth_token: Option<String>,
}

impl DomainRequest {
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Normalized handler reply. Every return path populates all four fields.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResult {
    pub message: String,
    pub success: bool,
    pub structured_data: Option<Value>,
    pub error_detail: Option<String>,
}

impl HandlerResult {
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
            structured_data: None,
            error_detail: None,
        }
    }

    #[must_use]
    pub fn ok_with_data(message: impl Into<String>, data: Value) -> Self {
        Self {
            message: message.into(),
            success: true,
            structured_data: Some(data),
            error_detail: None,
        }
    }

    #[must_use]
    pub fn failure(message: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
            structured_data: None,
            error_detail: detail,
        }
    }

    /// Distinct response subtype so a client can trigger a login flow.
    #[must_use]
    pub fn authentication_required(handler: &str) -> Self {
        Self {
            message: "Authentication required. Please connect your Google account.".to_string(),
            success: false,
            structured_data: Some(serde_json::json!({ "type": "authentication_required" })),
            error_detail: Some(format!("missing credential for handler '{handler}'")),
        }
    }

    #[must_use]
    pub fn is_authentication_required(&self) -> bool {
        self.structured_data
            .as_ref()
            .and_then(|data| data.get("type"))
            .and_then(Value::as_str)
            == Some("authentication_required")
    }
}

pub type HandlerFuture = BoxFuture<'static, anyhow::Result<HandlerResult>>;
pub type HandlerFn = Arc<dyn Fn(Arc<AppContext>, DomainRequest) -> HandlerFuture + Send + Sync>;

/// Invocation capability of a registry entry. Integrations that are planned
/// but not wired up carry an explicit marker instead of a null handler.
#[derive(Clone)]
pub enum HandlerInvoke {
    Ready(HandlerFn),
    NotImplemented,
}

/// One domain handler as registered at process start. Only `available` is
/// mutable afterwards, and only through atomic accessors.
pub struct HandlerDescriptor {
    pub id: &'static str,
    pub description: &'static str,
    pub keywords: &'static [&'static str],
    pub capabilities: &'static [&'static str],
    pub requires_auth: bool,
    available: AtomicBool,
    pub invoke: HandlerInvoke,
}

impl HandlerDescriptor {
    #[must_use]
    pub fn new(
        id: &'static str,
        description: &'static str,
        keywords: &'static [&'static str],
        capabilities: &'static [&'static str],
        requires_auth: bool,
        invoke: HandlerInvoke,
    ) -> Self {
        Self {
            id,
            description,
            keywords,
            capabilities,
            requires_auth,
            available: AtomicBool::new(true),
            invoke,
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    /// Operational toggle; not part of the request hot path.
    pub fn set_available(&self, value: bool) {
        self.available.store(value, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_implemented(&self) -> bool {
        matches!(self.invoke, HandlerInvoke::Ready(_))
    }

    #[must_use]
    pub fn summary(&self) -> HandlerSummary {
        HandlerSummary {
            id: self.id,
            description: self.description,
            keywords: self.keywords,
        }
    }
}

/// The slice of a descriptor handed to classifiers.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HandlerSummary {
    pub id: &'static str,
    pub description: &'static str,
    pub keywords: &'static [&'static str],
}

/// Ordered handler registry, built once at startup. Registration order is
/// meaningful: it defines classifier tie-break precedence.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: Vec<Arc<HandlerDescriptor>>,
}

impl HandlerRegistry {
    pub fn insert(&mut self, descriptor: HandlerDescriptor) {
        self.entries.push(Arc::new(descriptor));
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<HandlerDescriptor>> {
        self.entries.iter().find(|entry| entry.id == id).cloned()
    }

    #[must_use]
    pub fn entries(&self) -> &[Arc<HandlerDescriptor>] {
        &self.entries
    }

    #[must_use]
    pub fn summaries(&self) -> Vec<HandlerSummary> {
        self.entries.iter().map(|entry| entry.summary()).collect()
    }
}

/// Shared, request-independent context handed to every handler.
#[derive(Clone)]
pub struct AppContext {
    pub providers: Arc<ProviderClients>,
    pub state: Arc<ServerState>,
}

impl AppContext {
    #[must_use]
    pub fn new(providers: ProviderClients) -> Self {
        Self {
            providers: Arc::new(providers),
            state: Arc::new(ServerState::default()),
        }
    }

    pub async fn record_telemetry(&self, entry: TelemetryEntry) {
        let mut guard = self.state.telemetry_log.lock().await;
        guard.push(entry);
        const MAX_ENTRIES: usize = 200;
        if guard.len() > MAX_ENTRIES {
            let overflow = guard.len() - MAX_ENTRIES;
            guard.drain(0..overflow);
        }
    }

    pub async fn telemetry_snapshot(&self) -> Vec<TelemetryEntry> {
        self.state.telemetry_log.lock().await.clone()
    }
}

#[derive(Default)]
pub struct ServerState {
    pub telemetry_log: Mutex<Vec<TelemetryEntry>>,
}

#[derive(Clone, Serialize)]
pub struct TelemetryEntry {
    pub handler: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub latency_ms: u64,
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_flag_toggles_atomically() {
        let descriptor = HandlerDescriptor::new(
            "probe",
            "availability probe",
            &[],
            &[],
            false,
            HandlerInvoke::NotImplemented,
        );
        assert!(descriptor.is_available());
        descriptor.set_available(false);
        assert!(!descriptor.is_available());
    }

    #[test]
    fn registry_preserves_insertion_order() {
        let mut registry = HandlerRegistry::default();
        for id in ["alpha", "beta", "gamma"] {
            registry.insert(HandlerDescriptor::new(
                id,
                "",
                &[],
                &[],
                false,
                HandlerInvoke::NotImplemented,
            ));
        }
        let ids: Vec<_> = registry.summaries().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["alpha", "beta", "gamma"]);
        assert!(registry.get("beta").is_some());
        assert!(registry.get("delta").is_none());
    }

    #[test]
    fn authentication_required_results_are_detectable() {
        let result = HandlerResult::authentication_required("email");
        assert!(!result.success);
        assert!(result.is_authentication_required());
        assert!(!HandlerResult::ok("done").is_authentication_required());
    }
}
