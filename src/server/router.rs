use std::collections::BTreeMap;
use std::time::Duration;

use agent_flow::{session_channel, AgentReply};
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use formpilot_core_types::{IntentId, SessionId};
use formpilot_recipes::{classify_intent, Sitemap};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::time::timeout;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use super::state::ServeState;
use super::worker::{run_session, SessionSpec};

/// How long one chat request waits for the agent's next reply. The worker
/// may be driving a real browser through several pages, so this is generous.
const RESPONSE_WAIT: Duration = Duration::from_secs(120);

pub(crate) fn build_router(state: ServeState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/intents", get(intents_handler))
        .route("/agent/chat", post(chat_handler))
        .route("/agent/session/:id", delete(close_session_handler))
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatRequest {
    /// Absent for the opening message; set on every follow-up.
    session_id: Option<String>,
    #[serde(alias = "prompt")]
    message: Option<String>,
    #[serde(default)]
    profile: Map<String, Value>,
    headless: Option<bool>,
    /// Skip keyword classification and force this intent.
    intent: Option<String>,
}

async fn chat_handler(
    State(state): State<ServeState>,
    Json(req): Json<ChatRequest>,
) -> Json<Value> {
    match req.session_id {
        Some(raw) => continue_session(state, SessionId(raw), req.message).await,
        None => open_session(state, req).await,
    }
}

/// Start a new session: classify the prompt, register the queue pair, spawn
/// the worker, and hand back the agent's first reply.
async fn open_session(state: ServeState, req: ChatRequest) -> Json<Value> {
    let Some(message) = req.message else {
        return error_reply(None, "a message is required to start a session");
    };

    let classified = classify_intent(&message);
    let (intent, params) = match (req.intent, classified) {
        (Some(forced), Some(c)) => (forced, c.params),
        (Some(forced), None) => (forced, BTreeMap::new()),
        (None, Some(c)) => (c.intent, c.params),
        (None, None) => {
            return error_reply(
                None,
                "could not determine what you want to do; try rephrasing or pass an intent",
            );
        }
    };
    if !state.recipe.intents.contains_key(&intent) {
        return error_reply(None, &format!("unknown intent: {intent}"));
    }

    let params: Map<String, Value> = params
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();

    let id = SessionId::new();
    let (handle, queues) = session_channel();
    state.registry.insert(
        id.clone(),
        IntentId::from(intent.as_str()),
        handle.input_tx,
        handle.output_rx,
    );
    info!(session = %id, intent, "session opened");

    let spec = SessionSpec {
        intent,
        params,
        profile: req.profile,
        headless: req.headless.unwrap_or(state.config.headless),
        recipe: state.recipe.clone(),
        config: state.config.clone(),
    };
    tokio::spawn(run_session(spec, queues));

    next_reply(&state, &id).await
}

/// Forward a follow-up message to a running session and wait for the reply.
async fn continue_session(
    state: ServeState,
    id: SessionId,
    message: Option<String>,
) -> Json<Value> {
    let Some(ctx) = state.registry.get(&id) else {
        return error_reply(Some(&id), "unknown session");
    };
    ctx.touch();

    if let Some(message) = message {
        if ctx.input_tx.send(message).await.is_err() {
            warn!(session = %id, "session worker gone, closing");
            state.registry.remove(&id);
            return error_reply(Some(&id), "session is no longer running");
        }
    }

    next_reply(&state, &id).await
}

/// Drain the session's next reply, bounded by [`RESPONSE_WAIT`]. Terminal
/// replies retire the session from the registry.
async fn next_reply(state: &ServeState, id: &SessionId) -> Json<Value> {
    let Some(ctx) = state.registry.get(id) else {
        return error_reply(Some(id), "unknown session");
    };

    let mut rx = ctx.output_rx.lock().await;
    match timeout(RESPONSE_WAIT, rx.recv()).await {
        Ok(Some(reply)) => {
            ctx.touch();
            if reply.is_terminal() {
                state.registry.remove(id);
            }
            reply_json(id, &reply)
        }
        Ok(None) => {
            state.registry.remove(id);
            error_reply(Some(id), "session ended unexpectedly")
        }
        Err(_) => error_reply(
            Some(id),
            &format!("no reply from the agent within {}s", RESPONSE_WAIT.as_secs()),
        ),
    }
}

fn reply_json(id: &SessionId, reply: &AgentReply) -> Json<Value> {
    let mut value = serde_json::to_value(reply).unwrap_or_else(|_| json!({"status": "error"}));
    if let Some(map) = value.as_object_mut() {
        map.insert("session_id".into(), Value::String(id.to_string()));
    }
    Json(value)
}

fn error_reply(id: Option<&SessionId>, message: &str) -> Json<Value> {
    let mut value = json!({ "status": "error", "error": message });
    if let (Some(id), Some(map)) = (id, value.as_object_mut()) {
        map.insert("session_id".into(), Value::String(id.to_string()));
    }
    Json(value)
}

async fn close_session_handler(
    State(state): State<ServeState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    let id = SessionId(id);
    if state.registry.remove(&id) {
        info!(session = %id, "session closed by caller");
        (StatusCode::OK, Json(json!({ "status": "closed" })))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": "error", "error": "unknown session" })),
        )
    }
}

async fn health_handler(State(state): State<ServeState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "formpilot",
        "active_sessions": state.registry.len(),
    }))
}

async fn intents_handler(State(state): State<ServeState>) -> Json<Value> {
    let sitemap = Sitemap::new(state.recipe.as_ref().clone());
    let intents: Vec<Value> = state
        .recipe
        .intents
        .iter()
        .map(|(id, spec)| {
            json!({
                "intent": id,
                "description": spec.description,
                "params": spec.params,
            })
        })
        .collect();
    Json(json!({
        "site": state.recipe.site_name,
        "pages": sitemap.describe_site(),
        "intents": intents,
    }))
}
