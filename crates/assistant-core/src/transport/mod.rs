use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use provider_client::types::GeoPoint;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::dispatch::Dispatcher;
use crate::state::DomainRequest;

const SERVICE_NAME: &str = "assistant-backend";

#[derive(Clone)]
struct HttpState {
    dispatcher: Arc<Dispatcher>,
}

#[derive(Debug, Deserialize)]
struct LocationPayload {
    latitude: f64,
    longitude: f64,
    #[allow(dead_code)]
    accuracy: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    user_id: Option<String>,
    #[allow(dead_code)]
    session_id: Option<String>,
    location: Option<LocationPayload>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
    intent_category: String,
    agent_used: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

/// Build the HTTP surface around an injected dispatcher. No globals: the
/// caller owns the dispatcher and hands a reference in.
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    let state = HttpState { dispatcher };
    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .route("/agents", get(agents))
        .route("/", get(root))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, dispatcher: Arc<Dispatcher>) -> Result<()> {
    let app = router(dispatcher);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "HTTP transport listening");
    axum::serve(listener, app)
        .await
        .context("HTTP server terminated")?;
    Ok(())
}

async fn chat(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let auth_token = bearer_token(&headers);
    let location = request
        .location
        .map(|payload| GeoPoint::new(payload.latitude, payload.longitude));

    let routed = state
        .dispatcher
        .route(DomainRequest {
            text: request.message,
            user_id: request.user_id,
            location,
            auth_token,
        })
        .await;

    Json(ChatResponse {
        response: routed.result.message,
        intent_category: routed.intent_category,
        agent_used: routed.agent_used,
        success: routed.result.success,
        data: routed.result.structured_data,
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": SERVICE_NAME }))
}

async fn agents(State(state): State<HttpState>) -> Json<Value> {
    Json(json!({ "agents": state.dispatcher.describe_registry() }))
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Intelligent personal assistant API",
        "endpoints": {
            "chat": "/chat - main orchestrator endpoint",
            "health": "/health - health check",
            "agents": "/agents - handler registry dump",
        },
    }))
}
