use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use assistant_core::classify::{Classification, IntentClassifier};
use assistant_core::dispatch::{Dispatcher, ORCHESTRATOR_ID};
use assistant_core::state::{
    AppContext, DomainRequest, HandlerDescriptor, HandlerFn, HandlerInvoke, HandlerRegistry,
    HandlerResult, HandlerSummary,
};
use provider_client::types::GeoPoint;
use provider_client::ProviderClients;
use tokio_util::sync::CancellationToken;

struct FixedClassifier {
    decision: Classification,
    calls: Arc<AtomicUsize>,
}

impl FixedClassifier {
    fn new(decision: Classification) -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Arc::new(Self {
                decision,
                calls: calls.clone(),
            }),
            calls,
        )
    }
}

#[async_trait]
impl IntentClassifier for FixedClassifier {
    async fn classify(
        &self,
        _text: &str,
        _handlers: &[HandlerSummary],
        _location: Option<GeoPoint>,
    ) -> Result<Classification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.decision.clone())
    }
}

struct FailingClassifier;

#[async_trait]
impl IntentClassifier for FailingClassifier {
    async fn classify(
        &self,
        _text: &str,
        _handlers: &[HandlerSummary],
        _location: Option<GeoPoint>,
    ) -> Result<Classification> {
        anyhow::bail!("upstream classifier outage")
    }
}

fn counting_handler(result: fn() -> Result<HandlerResult>) -> (HandlerFn, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in_handler = calls.clone();
    let handler: HandlerFn = Arc::new(move |_context, _request| {
        let calls = calls_in_handler.clone();
        Box::pin(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            result()
        })
    });
    (handler, calls)
}

fn dispatcher_with(
    descriptors: Vec<HandlerDescriptor>,
    classifier: Arc<dyn IntentClassifier>,
) -> Dispatcher {
    let context = Arc::new(AppContext::new(ProviderClients::new()));
    let mut registry = HandlerRegistry::default();
    for descriptor in descriptors {
        registry.insert(descriptor);
    }
    Dispatcher::builder(context, Arc::new(registry), classifier)
        .record_telemetry(false)
        .build()
}

fn gated_descriptor(invoke: HandlerInvoke) -> HandlerDescriptor {
    HandlerDescriptor::new(
        "mailbox",
        "credentialed mailbox handler",
        &["mail"],
        &["send"],
        true,
        invoke,
    )
}

#[tokio::test]
async fn empty_message_short_circuits_before_classification() {
    let (classifier, classifier_calls) =
        FixedClassifier::new(Classification::Handler("mailbox".to_string()));
    let (handler, handler_calls) = counting_handler(|| Ok(HandlerResult::ok("hi")));
    let dispatcher = dispatcher_with(
        vec![gated_descriptor(HandlerInvoke::Ready(handler))],
        classifier,
    );

    let routed = dispatcher.route(DomainRequest::from_text("   ")).await;

    assert!(!routed.result.success);
    assert_eq!(routed.agent_used, ORCHESTRATOR_ID);
    assert_eq!(routed.intent_category, "general");
    assert!(!routed.result.message.is_empty());
    assert_eq!(classifier_calls.load(Ordering::SeqCst), 0);
    assert_eq!(handler_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn auth_gate_blocks_before_the_handler_runs() {
    let (classifier, _) = FixedClassifier::new(Classification::Handler("mailbox".to_string()));
    let (handler, handler_calls) = counting_handler(|| Ok(HandlerResult::ok("sent")));
    let dispatcher = dispatcher_with(
        vec![gated_descriptor(HandlerInvoke::Ready(handler))],
        classifier,
    );

    let routed = dispatcher
        .route(DomainRequest::from_text("check my mail"))
        .await;

    assert!(!routed.result.success);
    assert!(routed.result.is_authentication_required());
    assert_eq!(routed.agent_used, "mailbox");
    assert_eq!(handler_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn token_passes_the_gate() {
    let (classifier, _) = FixedClassifier::new(Classification::Handler("mailbox".to_string()));
    let (handler, handler_calls) = counting_handler(|| Ok(HandlerResult::ok("sent")));
    let dispatcher = dispatcher_with(
        vec![gated_descriptor(HandlerInvoke::Ready(handler))],
        classifier,
    );

    let mut request = DomainRequest::from_text("check my mail");
    request.auth_token = Some("ya29.token".to_string());
    let routed = dispatcher.route(request).await;

    assert!(routed.result.success);
    assert_eq!(handler_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_classifier_id_degrades_to_generic_reply() {
    let (classifier, _) = FixedClassifier::new(Classification::Handler("ghost".to_string()));
    let dispatcher = dispatcher_with(vec![], classifier);

    let routed = dispatcher
        .route(DomainRequest::from_text("do something"))
        .await;

    assert!(routed.result.success);
    assert_eq!(routed.agent_used, ORCHESTRATOR_ID);
}

#[tokio::test]
async fn no_match_gets_the_conversational_fallback() {
    let (classifier, _) = FixedClassifier::new(Classification::NoMatch);
    let dispatcher = dispatcher_with(vec![], classifier);

    let routed = dispatcher
        .route(DomainRequest::from_text("tell me a joke"))
        .await;

    assert!(routed.result.success);
    assert_eq!(routed.agent_used, ORCHESTRATOR_ID);
    assert_eq!(routed.intent_category, "general");
}

#[tokio::test]
async fn classifier_failure_never_fails_the_request() {
    let dispatcher = dispatcher_with(vec![], Arc::new(FailingClassifier));

    let routed = dispatcher
        .route(DomainRequest::from_text("quero pizza"))
        .await;

    assert!(routed.result.success);
    assert_eq!(routed.agent_used, ORCHESTRATOR_ID);
}

#[tokio::test]
async fn handler_errors_become_apologetic_results() {
    let (classifier, _) = FixedClassifier::new(Classification::Handler("mailbox".to_string()));
    let (handler, _) = counting_handler(|| Err(anyhow::anyhow!("mailbox exploded")));
    let dispatcher = dispatcher_with(
        vec![gated_descriptor(HandlerInvoke::Ready(handler))],
        classifier,
    );

    let mut request = DomainRequest::from_text("check my mail");
    request.auth_token = Some("token".to_string());
    let routed = dispatcher.route(request).await;

    assert!(!routed.result.success);
    assert_eq!(
        routed.result.error_detail.as_deref(),
        Some("mailbox exploded")
    );
    assert!(!routed.result.message.contains("exploded"));
}

#[tokio::test]
async fn typed_errors_keep_their_meaning_through_the_catch_all() {
    let (classifier, _) = FixedClassifier::new(Classification::Handler("mailbox".to_string()));
    let (handler, _) = counting_handler(|| {
        Err(assistant_core::error::AssistantError::UpstreamUnavailable(
            "merchant search timed out".to_string(),
        )
        .into())
    });
    let mut descriptor = gated_descriptor(HandlerInvoke::Ready(handler));
    descriptor.requires_auth = false;
    let dispatcher = dispatcher_with(vec![descriptor], classifier);

    let routed = dispatcher
        .route(DomainRequest::from_text("check my mail"))
        .await;

    assert!(!routed.result.success);
    assert!(routed.result.message.contains("not responding"));
    assert!(routed
        .result
        .error_detail
        .as_deref()
        .unwrap_or_default()
        .contains("merchant search timed out"));
}

#[tokio::test]
async fn unavailable_handlers_are_reported_not_invoked() {
    let (classifier, _) = FixedClassifier::new(Classification::Handler("mailbox".to_string()));
    let (handler, handler_calls) = counting_handler(|| Ok(HandlerResult::ok("sent")));
    let descriptor = gated_descriptor(HandlerInvoke::Ready(handler));
    descriptor.set_available(false);
    let dispatcher = dispatcher_with(vec![descriptor], classifier);

    let routed = dispatcher
        .route(DomainRequest::from_text("check my mail"))
        .await;

    assert!(!routed.result.success);
    assert!(routed.result.message.contains("unavailable"));
    assert_eq!(handler_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn not_implemented_entries_answer_politely() {
    let (classifier, _) = FixedClassifier::new(Classification::Handler("mailbox".to_string()));
    let mut descriptor = gated_descriptor(HandlerInvoke::NotImplemented);
    descriptor.requires_auth = false;
    let dispatcher = dispatcher_with(vec![descriptor], classifier);

    let routed = dispatcher
        .route(DomainRequest::from_text("check my mail"))
        .await;

    assert!(!routed.result.success);
    assert!(routed
        .result
        .error_detail
        .as_deref()
        .unwrap_or_default()
        .contains("not implemented"));
}

#[tokio::test]
async fn telemetry_records_each_dispatched_call() {
    let (classifier, _) = FixedClassifier::new(Classification::Handler("mailbox".to_string()));
    let (handler, _) = counting_handler(|| Ok(HandlerResult::ok("sent")));
    let mut descriptor = gated_descriptor(HandlerInvoke::Ready(handler));
    descriptor.requires_auth = false;

    let context = Arc::new(AppContext::new(ProviderClients::new()));
    let mut registry = HandlerRegistry::default();
    registry.insert(descriptor);
    let dispatcher = Dispatcher::builder(context.clone(), Arc::new(registry), classifier).build();

    dispatcher
        .route(DomainRequest::from_text("check my mail"))
        .await;

    let entries = context.telemetry_snapshot().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].handler, "mailbox");
    assert!(entries[0].success);
}

#[tokio::test(start_paused = true)]
async fn cancellation_aborts_in_flight_handlers() {
    let (classifier, _) = FixedClassifier::new(Classification::Handler("slow".to_string()));
    let token = CancellationToken::new();
    let completed = Arc::new(AtomicUsize::new(0));

    let handler_token = token.clone();
    let handler_completed = completed.clone();
    let handler: HandlerFn = Arc::new(move |_context, _request| {
        let token = handler_token.clone();
        let completed = handler_completed.clone();
        Box::pin(async move {
            token.cancel();
            tokio::time::sleep(std::time::Duration::from_secs(300)).await;
            completed.fetch_add(1, Ordering::SeqCst);
            Ok(HandlerResult::ok("too late"))
        })
    });

    let descriptor = HandlerDescriptor::new(
        "slow",
        "slow handler",
        &[],
        &[],
        false,
        HandlerInvoke::Ready(handler),
    );
    let dispatcher = dispatcher_with(vec![descriptor], classifier);

    let routed = dispatcher
        .route_with_cancel(DomainRequest::from_text("hang forever"), token)
        .await;

    assert!(!routed.result.success);
    assert_eq!(
        routed.result.error_detail.as_deref(),
        Some("cancelled by caller")
    );
    assert_eq!(completed.load(Ordering::SeqCst), 0);
}
