//! Server side of the credential split: clients post OpenAI-format bodies here
//! without any token, the proxy forwards them upstream with its bearer token.

use crate::{
    config::ProxyConfig,
    messages::{CHAT_COMPLETIONS_PATH, IMAGE_GENERATIONS_PATH},
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Debug)]
pub struct ProxyState {
    http: reqwest::Client,
    config: ProxyConfig,
}

impl ProxyState {
    pub fn new(http: reqwest::Client, config: ProxyConfig) -> Self {
        Self { http, config }
    }
}

/// Routes of the proxy.
pub fn router(state: ProxyState) -> Router {
    let body_limit = state.config.body_limit;
    Router::new()
        .route("/", get(|| async { "Welcome to the virtual try-on proxy!" }))
        .route(CHAT_COMPLETIONS_PATH, post(post_chat_completions))
        .route(IMAGE_GENERATIONS_PATH, post(post_image_generations))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(Arc::new(state))
}

async fn post_chat_completions(
    State(state): State<Arc<ProxyState>>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    forward(&state, CHAT_COMPLETIONS_PATH, payload).await
}

async fn post_image_generations(
    State(state): State<Arc<ProxyState>>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    forward(&state, IMAGE_GENERATIONS_PATH, payload).await
}

async fn forward(state: &ProxyState, path: &str, payload: Value) -> (StatusCode, Json<Value>) {
    let model = payload.get("model").and_then(Value::as_str).unwrap_or_default();
    if !state.config.allowed_models.iter().any(|allowed| allowed == model) {
        log::warn!("Refusing to forward {path} for model `{model}`");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("model `{model}` is not allowed") })),
        );
    }

    let url = format!("{}{}", state.config.upstream_url.trim_end_matches('/'), path);
    log::debug!("Forwarding {path} for model `{model}`");

    let response = match state
        .http
        .post(&url)
        .bearer_auth(state.config.api_key.expose())
        .json(&payload)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            log::error!("Upstream request to {path} failed: {e}");
            return (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "upstream request failed" })),
            );
        }
    };

    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    match response.json::<Value>().await {
        Ok(body) => {
            log::info!("Upstream {path} answered {status}");
            (status, Json(body))
        }
        Err(e) => {
            log::error!("Upstream {path} answered {status} with an unreadable body: {e}");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "upstream returned an invalid body" })),
            )
        }
    }
}
