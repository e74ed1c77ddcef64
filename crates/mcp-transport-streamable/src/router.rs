//! The axum router: the single `/mcp` endpoint (configurable path) handling
//! POST, GET, and DELETE, per spec.md §4.7.
//!
//! Grounded in `turbomcp-transport::streamable_http_v2::{create_router,
//! mcp_get_handler, mcp_post_handler, mcp_delete_handler}`, reworked from a
//! handler-trait-object design (`turbomcp_protocol::JsonRpcHandler`) onto
//! this workspace's `mcp_engine::Dispatcher` + `mcp_session::Session` pair,
//! and trimmed of the teacher's IP-binding/rate-limiting security layer
//! (`turbomcp-transport::security`) in favor of the simpler pluggable
//! [`crate::oauth::AuthValidator`] seam.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use mcp_engine::{DispatchAction, Dispatcher, EngineConfig};
use mcp_protocol::types::Implementation;
use mcp_protocol::version::SUPPORTED_VERSIONS;
use mcp_protocol::ServerCapabilities;
use mcp_session::SessionId;
use uuid::Uuid;

use crate::config::{PostResponseMode, StreamableHttpConfig};
use crate::oauth::{self, AuthValidator};
use crate::session_store::{HttpSession, InMemorySessionStore, SessionStore};

/// Shared state every handler closes over.
pub struct AppState {
    pub config: StreamableHttpConfig,
    pub dispatcher: Dispatcher,
    pub engine_config: EngineConfig,
    pub sessions: Arc<dyn SessionStore>,
    pub validator: Arc<dyn AuthValidator>,
}

/// Build the router: one endpoint at `config.endpoint_path` answering
/// GET/POST/DELETE, plus the OAuth well-known route when
/// `config.oauth_resource_metadata` is set.
pub fn build_router(
    config: StreamableHttpConfig,
    dispatcher: Dispatcher,
    engine_config: EngineConfig,
    validator: Arc<dyn AuthValidator>,
) -> Router {
    let has_oauth = config.oauth_resource_metadata.is_some();
    let endpoint_path = config.endpoint_path.clone();

    let state = Arc::new(AppState {
        config,
        dispatcher,
        engine_config,
        sessions: Arc::new(InMemorySessionStore::new()),
        validator,
    });

    let mut router = Router::new().route(
        &endpoint_path,
        get(mcp_get).post(mcp_post).delete(mcp_delete),
    );

    if has_oauth {
        router = router.route(
            "/.well-known/oauth-protected-resource",
            get(oauth_metadata),
        );
    }

    router.with_state(state)
}

async fn oauth_metadata(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let Some(metadata) = &state.config.oauth_resource_metadata else {
        return StatusCode::NOT_FOUND.into_response();
    };
    Json(oauth::protected_resource_document(&resource_url(&state.config), metadata)).into_response()
}

fn resource_url(config: &StreamableHttpConfig) -> String {
    match &config.external_base_url {
        Some(base) => format!("{base}{}", config.endpoint_path),
        None => config.endpoint_path.clone(),
    }
}

fn metadata_url(config: &StreamableHttpConfig) -> String {
    match &config.external_base_url {
        Some(base) => format!("{base}/.well-known/oauth-protected-resource"),
        None => "/.well-known/oauth-protected-resource".to_string(),
    }
}

/// Whether `body` is (or contains, for a batch) an `initialize` request —
/// the one method allowed to arrive without a prior `Mcp-Session-Id`.
fn looks_like_initialize(body: &[u8]) -> bool {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) else {
        return false;
    };
    let is_initialize = |v: &serde_json::Value| v.get("method").and_then(|m| m.as_str()) == Some("initialize");
    match &value {
        serde_json::Value::Array(items) => items.iter().any(is_initialize),
        other => is_initialize(other),
    }
}

fn session_header(state: &AppState, headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get(state.config.session_header_name.as_str())
        .and_then(|v| v.to_str().ok())
        .and_then(SessionId::try_from_str)
}

async fn require_session(state: &Arc<AppState>, headers: &HeaderMap) -> Result<Arc<HttpSession>, StatusCode> {
    let id = session_header(state, headers).ok_or(StatusCode::NOT_FOUND)?;
    state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)
}

async fn authorize(state: &Arc<AppState>, headers: &HeaderMap) -> Result<(), Response> {
    if state.config.oauth_resource_metadata.is_none() {
        return Ok(());
    }
    let header_value = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    let token = match oauth::parse_bearer(header_value) {
        Ok(token) => token,
        Err(_) => return Err(unauthorized(state)),
    };
    match state.validator.validate(token).await {
        Ok(_) => Ok(()),
        Err(_) => Err(unauthorized(state)),
    }
}

fn unauthorized(state: &Arc<AppState>) -> Response {
    let mut headers = HeaderMap::new();
    if state.config.oauth_resource_metadata.is_some() {
        let challenge = oauth::www_authenticate_header(&metadata_url(&state.config));
        if let Ok(value) = HeaderValue::from_str(&challenge) {
            headers.insert(header::WWW_AUTHENTICATE, value);
        }
    }
    (StatusCode::UNAUTHORIZED, headers, "unauthorized").into_response()
}

/// GET: opens the long-lived SSE stream for server-initiated traffic.
async fn mcp_get(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Response, Response> {
    if let Err(resp) = authorize(&state, &headers).await {
        return Err(resp);
    }

    let accept = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()).unwrap_or("");
    if !accept.contains("text/event-stream") {
        return Err(StatusCode::NOT_ACCEPTABLE.into_response());
    }

    let http_session = require_session(&state, &headers).await.map_err(IntoResponse::into_response)?;
    let last_event_id = headers.get("Last-Event-ID").and_then(|v| v.to_str().ok()).map(str::to_string);

    let transport = Arc::clone(&http_session.transport);
    let (subscriber_id, mut rx) = transport.subscribe().await;
    let replay = match &last_event_id {
        Some(id) => transport.replay_after(id).await,
        None => Vec::new(),
    };
    let keepalive = state.config.keepalive_interval;

    let stream = async_stream::stream! {
        let endpoint_event = Event::default()
            .event("endpoint")
            .data(state.config.endpoint_path.clone())
            .id(Uuid::new_v4().to_string());
        yield Ok::<Event, std::convert::Infallible>(endpoint_event);

        for stored in replay {
            yield Ok(Event::default().event("message").data(stored.data).id(stored.id));
        }

        while let Some(event) = rx.recv().await {
            let mut out = Event::default().data(event.data);
            if let Some(id) = event.id {
                out = out.id(id);
            }
            if let Some(kind) = event.event {
                out = out.event(kind);
            }
            yield Ok(out);
        }

        transport.unsubscribe(subscriber_id);
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(keepalive)).into_response())
}

/// POST: accepts one JSON-RPC payload (single or batch).
async fn mcp_post(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(resp) = authorize(&state, &headers).await {
        return resp;
    }

    let protocol_version = headers
        .get("MCP-Protocol-Version")
        .and_then(|v| v.to_str().ok())
        .unwrap_or(SUPPORTED_VERSIONS[SUPPORTED_VERSIONS.len() - 1].as_str());

    if !SUPPORTED_VERSIONS.iter().any(|v| v.as_str() == protocol_version) {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({
            "error": "unsupported protocol version",
        }))).into_response();
    }

    let existing = session_header(&state, &headers);
    let is_initialize = looks_like_initialize(&body);
    let http_session = match existing {
        Some(id) => match state.sessions.get(&id) {
            Some(s) => s,
            None => return StatusCode::NOT_FOUND.into_response(),
        },
        None if is_initialize => {
            let id = SessionId::new();
            let session = Arc::new(HttpSession::new(id.clone(), &state.config, state.engine_config.clone()));
            state.sessions.insert(id, Arc::clone(&session));
            session
        }
        // Per spec.md §4.7: the server requires the session header on every
        // call after the session was created by `initialize`.
        None => return StatusCode::BAD_REQUEST.into_response(),
    };

    let action = state.dispatcher.on_frame(&body, &http_session.session).await;

    let mut response_headers = HeaderMap::new();
    if let (Ok(name), Ok(value)) = (
        header::HeaderName::from_bytes(state.config.session_header_name.as_bytes()),
        HeaderValue::from_str(http_session.session.session_id.as_str()),
    ) {
        response_headers.insert(name, value);
    }

    match action {
        DispatchAction::NoReply => (StatusCode::ACCEPTED, response_headers, Json(serde_json::json!({}))).into_response(),
        DispatchAction::Single(value) => reply(&state, &headers, response_headers, value),
        DispatchAction::Batch(values) => reply(&state, &headers, response_headers, serde_json::Value::Array(values)),
    }
}

fn reply(
    state: &Arc<AppState>,
    headers: &HeaderMap,
    response_headers: HeaderMap,
    value: serde_json::Value,
) -> Response {
    let accept = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()).unwrap_or("");
    let wants_sse = matches!(state.config.post_response_mode, PostResponseMode::PreferSseWhenAccepted)
        && accept.contains("text/event-stream");

    if wants_sse {
        let data = value.to_string();
        let stream = async_stream::stream! {
            yield Ok::<Event, std::convert::Infallible>(Event::default().event("message").data(data));
        };
        return (response_headers, Sse::new(stream).keep_alive(KeepAlive::default())).into_response();
    }

    (StatusCode::OK, response_headers, Json(value)).into_response()
}

/// DELETE: tears down a session.
async fn mcp_delete(State(state): State<Arc<AppState>>, headers: HeaderMap) -> StatusCode {
    match session_header(&state, &headers) {
        Some(id) => match state.sessions.remove(&id) {
            Some(session) => {
                session.session.begin_terminate();
                session.engine.cancel_all();
                StatusCode::OK
            }
            None => StatusCode::NOT_FOUND,
        },
        None => StatusCode::BAD_REQUEST,
    }
}

/// Construct a [`Dispatcher`] with the given `Implementation`/capabilities —
/// a small convenience so embedding applications don't repeat the
/// `Arc::new(HandlerRegistry::new())` boilerplate at every call site.
pub fn dispatcher_for(
    registry: Arc<mcp_engine::HandlerRegistry>,
    local_info: Implementation,
    server_capabilities: ServerCapabilities,
) -> Dispatcher {
    Dispatcher::new(registry, local_info, server_capabilities)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_header_parses_configured_header_name() {
        let state = AppState {
            config: StreamableHttpConfig::default(),
            dispatcher: Dispatcher::new(
                Arc::new(mcp_engine::HandlerRegistry::new()),
                Implementation { name: "test".into(), title: None, version: "0.1.0".into() },
                ServerCapabilities::default(),
            ),
            engine_config: EngineConfig::default(),
            sessions: Arc::new(InMemorySessionStore::new()),
            validator: Arc::new(oauth::NoopValidator),
        };
        let id = SessionId::new();
        let mut headers = HeaderMap::new();
        headers.insert("Mcp-Session-Id", HeaderValue::from_str(id.as_str()).unwrap());
        assert_eq!(session_header(&state, &headers).unwrap().as_str(), id.as_str());
    }

    #[test]
    fn looks_like_initialize_detects_single_and_batched_requests() {
        assert!(looks_like_initialize(br#"{"jsonrpc":"2.0","method":"initialize","id":1}"#));
        assert!(!looks_like_initialize(br#"{"jsonrpc":"2.0","method":"ping","id":1}"#));
        assert!(looks_like_initialize(
            br#"[{"jsonrpc":"2.0","method":"ping","id":1},{"jsonrpc":"2.0","method":"initialize","id":2}]"#
        ));
        assert!(!looks_like_initialize(b"not json"));
    }
}
