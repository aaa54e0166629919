use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::classify::{Classification, IntentClassifier};
use crate::error::AssistantError;
use crate::state::{
    AppContext, DomainRequest, HandlerInvoke, HandlerRegistry, HandlerResult, TelemetryEntry,
};

const CLASSIFY_DEADLINE: StdDuration = StdDuration::from_secs(10);

/// Identity used for replies the orchestrator produces itself, when no
/// specialized handler applies.
pub const ORCHESTRATOR_ID: &str = "orchestrator";
const GENERAL_CATEGORY: &str = "general";

const EMPTY_MESSAGE_GUIDANCE: &str = "I didn't catch that. Tell me what you need — for example \
'quero pizza', 'take me to the airport', or 'list my events'.";
const FALLBACK_REPLY: &str = "I can help with rides, food delivery, email and calendar. \
What would you like to do?";

/// A dispatched reply: the normalized handler result plus which handler
/// produced it.
#[derive(Debug, Clone, Serialize)]
pub struct RoutedResponse {
    pub agent_used: String,
    pub intent_category: String,
    #[serde(flatten)]
    pub result: HandlerResult,
}

impl RoutedResponse {
    fn from_orchestrator(result: HandlerResult) -> Self {
        Self {
            agent_used: ORCHESTRATOR_ID.to_string(),
            intent_category: GENERAL_CATEGORY.to_string(),
            result,
        }
    }

    fn from_handler(id: &str, result: HandlerResult) -> Self {
        Self {
            agent_used: id.to_string(),
            intent_category: id.to_string(),
            result,
        }
    }
}

/// Routes one request to exactly one handler. Owns the registry for the
/// process lifetime; everything it produces per call is discarded with the
/// response.
pub struct Dispatcher {
    context: Arc<AppContext>,
    registry: Arc<HandlerRegistry>,
    classifier: Arc<dyn IntentClassifier>,
    record_telemetry: bool,
}

pub struct DispatcherBuilder {
    context: Arc<AppContext>,
    registry: Arc<HandlerRegistry>,
    classifier: Arc<dyn IntentClassifier>,
    record_telemetry: bool,
}

impl DispatcherBuilder {
    #[must_use]
    pub fn record_telemetry(mut self, enabled: bool) -> Self {
        self.record_telemetry = enabled;
        self
    }

    #[must_use]
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            context: self.context,
            registry: self.registry,
            classifier: self.classifier,
            record_telemetry: self.record_telemetry,
        }
    }
}

impl Dispatcher {
    pub fn builder(
        context: Arc<AppContext>,
        registry: Arc<HandlerRegistry>,
        classifier: Arc<dyn IntentClassifier>,
    ) -> DispatcherBuilder {
        DispatcherBuilder {
            context,
            registry,
            classifier,
            record_telemetry: true,
        }
    }

    #[must_use]
    pub fn context(&self) -> Arc<AppContext> {
        self.context.clone()
    }

    #[must_use]
    pub fn registry(&self) -> Arc<HandlerRegistry> {
        self.registry.clone()
    }

    /// Route a request with no external cancellation.
    pub async fn route(&self, request: DomainRequest) -> RoutedResponse {
        self.route_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Route a request, aborting in-flight classification or handler work
    /// when `cancel` fires. Remaining fallback attempts are skipped rather
    /// than completed uselessly.
    #[instrument(name = "dispatch.route", skip(self, request, cancel), fields(user_id = ?request.user_id))]
    pub async fn route_with_cancel(
        &self,
        request: DomainRequest,
        cancel: CancellationToken,
    ) -> RoutedResponse {
        if request.text.trim().is_empty() {
            return RoutedResponse::from_orchestrator(HandlerResult::failure(
                EMPTY_MESSAGE_GUIDANCE,
                Some("empty message".to_string()),
            ));
        }

        let classification = self.classify(&request, &cancel).await;

        let handler_id = match classification {
            Classification::Handler(id) => id,
            Classification::NoMatch => {
                return RoutedResponse::from_orchestrator(HandlerResult::ok(FALLBACK_REPLY));
            }
        };

        // The classifier is a black box; an id we do not know degrades to
        // the generic conversational reply.
        let Some(descriptor) = self.registry.get(&handler_id) else {
            warn!(handler = %handler_id, "classifier chose an unknown handler");
            return RoutedResponse::from_orchestrator(HandlerResult::ok(FALLBACK_REPLY));
        };

        if !descriptor.is_available() {
            return RoutedResponse::from_handler(
                descriptor.id,
                HandlerResult::failure(
                    format!("The {} service is temporarily unavailable.", descriptor.id),
                    Some(format!("handler '{}' is disabled", descriptor.id)),
                ),
            );
        }

        if descriptor.requires_auth && request.auth_token.is_none() {
            return RoutedResponse::from_handler(
                descriptor.id,
                HandlerResult::authentication_required(descriptor.id),
            );
        }

        let handler = match &descriptor.invoke {
            HandlerInvoke::Ready(handler) => handler.clone(),
            HandlerInvoke::NotImplemented => {
                return RoutedResponse::from_handler(
                    descriptor.id,
                    HandlerResult::failure(
                        format!(
                            "The {} integration is not available yet, but it is on the way.",
                            descriptor.id
                        ),
                        Some(format!("handler '{}' is not implemented", descriptor.id)),
                    ),
                );
            }
        };

        let started = Instant::now();
        let outcome = tokio::select! {
            () = cancel.cancelled() => {
                info!(handler = descriptor.id, "request cancelled mid-flight");
                return RoutedResponse::from_handler(
                    descriptor.id,
                    HandlerResult::failure(
                        "The request was cancelled.",
                        Some("cancelled by caller".to_string()),
                    ),
                );
            }
            outcome = handler(self.context.clone(), request) => outcome,
        };
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        // Nothing a handler does may propagate past this point.
        let result = match outcome {
            Ok(result) => result,
            Err(error) => {
                warn!(handler = descriptor.id, error = %error, "handler failed");
                failure_result(&error)
            }
        };

        if self.record_telemetry {
            self.context
                .record_telemetry(TelemetryEntry {
                    handler: descriptor.id.to_string(),
                    timestamp: OffsetDateTime::now_utc(),
                    latency_ms,
                    success: result.success,
                })
                .await;
        }

        RoutedResponse::from_handler(descriptor.id, result)
    }

    /// Classification with a bounded deadline. A failed, timed-out, or
    /// cancelled classifier degrades to no-match instead of failing the
    /// request.
    async fn classify(&self, request: &DomainRequest, cancel: &CancellationToken) -> Classification {
        let summaries = self.registry.summaries();
        let attempt = tokio::select! {
            () = cancel.cancelled() => return Classification::NoMatch,
            attempt = tokio::time::timeout(
                CLASSIFY_DEADLINE,
                self.classifier
                    .classify(&request.text, &summaries, request.location),
            ) => attempt,
        };
        match attempt {
            Ok(Ok(classification)) => classification,
            Ok(Err(error)) => {
                warn!(error = %error, "classifier failed; degrading to generic reply");
                Classification::NoMatch
            }
            Err(_) => {
                warn!("classifier timed out; degrading to generic reply");
                Classification::NoMatch
            }
        }
    }

    /// Registry dump for the agents endpoint.
    #[must_use]
    pub fn describe_registry(&self) -> Vec<Value> {
        self.registry
            .entries()
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "id": entry.id,
                    "description": entry.description,
                    "keywords": entry.keywords,
                    "capabilities": entry.capabilities,
                    "available": entry.is_available(),
                    "requires_auth": entry.requires_auth,
                    "implemented": entry.is_implemented(),
                })
            })
            .collect()
    }
}

/// Map a handler error onto the failure taxonomy. Typed assistant errors
/// keep their meaning across the boundary; anything else becomes a safe,
/// non-leaking apology with the detail tucked into `error_detail`.
fn failure_result(error: &anyhow::Error) -> HandlerResult {
    if let Some(known) = error.downcast_ref::<AssistantError>() {
        return match known {
            AssistantError::Validation(detail) => HandlerResult::failure(
                format!("I couldn't use that request: {detail}."),
                Some(known.to_string()),
            ),
            AssistantError::AuthenticationRequired(handler) => {
                HandlerResult::authentication_required(handler)
            }
            AssistantError::UpstreamUnavailable(_) => HandlerResult::failure(
                "That service is not responding right now. Please try again in a moment.",
                Some(known.to_string()),
            ),
            AssistantError::ProviderNotFound { available, .. } => HandlerResult::failure(
                format!("I don't know that service. Available: {}.", available.join(", ")),
                Some(known.to_string()),
            ),
            AssistantError::HandlerNotFound(_) | AssistantError::Internal(_) => {
                HandlerResult::failure(
                    "Sorry, I had trouble processing that request. Please try again.",
                    Some(known.to_string()),
                )
            }
        };
    }
    HandlerResult::failure(
        "Sorry, I had trouble processing that request. Please try again.",
        Some(error.to_string()),
    )
}
