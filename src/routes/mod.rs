//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::{path::Path, sync::Arc};

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - session API under `/api/v1/session/...`
/// - static frontend from `state.static_dir` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_dir = Path::new(&state.static_dir);
    let static_service = ServeDir::new(static_dir)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/session", get(http::http_get_session))
        .route("/api/v1/session/draft", put(http::http_put_draft))
        .route("/api/v1/session/activity", post(http::http_post_activity))
        .route("/api/v1/session/submit", post(http::http_post_submit))
        .route("/api/v1/session/hints/:index/use", post(http::http_post_use_hint))
        .route("/api/v1/session/keep-editing", post(http::http_post_keep_editing))
        .route("/api/v1/session/feedback/dismiss", post(http::http_post_dismiss_feedback))
        .route("/api/v1/session/reset", post(http::http_post_reset))
        .route("/api/v1/session/share", post(http::http_post_share))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::GameConfig, testing::ScriptedApi};
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    async fn app(api: Arc<ScriptedApi>) -> (Router, Arc<AppState>) {
        let state = Arc::new(AppState::new(api, GameConfig::default(), "./does-not-exist"));
        state.session.initialize().await.unwrap();
        (build_router(state.clone()), state)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    #[tokio::test]
    async fn health_and_session_view() {
        let (app, _) = app(Arc::new(ScriptedApi::new())).await;
        let (status, body) = call(&app, Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);

        let (status, body) = call(&app, Method::GET, "/api/v1/session", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "ready");
        assert_eq!(body["prompt"]["prompt"], "write a poem.");
        assert_eq!(body["badges"].as_array().unwrap().len(), 3);
        assert_eq!(body["max_hints"], 2);
    }

    #[tokio::test]
    async fn draft_then_submit_returns_outcome_and_view() {
        let api = Arc::new(ScriptedApi::new());
        let (app, _) = app(api.clone()).await;

        let (status, _) = call(&app, Method::POST, "/api/v1/session/submit", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) =
            call(&app, Method::PUT, "/api/v1/session/draft", Some(serde_json::json!({ "text": "A tangerine hums." }))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        api.push_scores([2, 2, 2]);
        let (status, body) = call(&app, Method::POST, "/api/v1/session/submit", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"]["won"], true);
        assert_eq!(body["session"]["phase"], "won");

        let (status, body) = call(&app, Method::POST, "/api/v1/session/submit", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("won"));

        let (status, body) = call(&app, Method::POST, "/api/v1/session/keep-editing", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "ready");
    }

    #[tokio::test]
    async fn remote_failure_maps_to_bad_gateway() {
        let api = Arc::new(ScriptedApi::new());
        let (app, _) = app(api.clone()).await;
        call(&app, Method::PUT, "/api/v1/session/draft", Some(serde_json::json!({ "text": "draft" }))).await;
        let (status, body) = call(&app, Method::POST, "/api/v1/session/submit", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("evaluate"));
    }

    #[tokio::test]
    async fn use_hint_route_applies_then_ignores() {
        let api = Arc::new(ScriptedApi::new());
        let (app, state) = app(api.clone()).await;
        api.push_hint(Ok("Try a color.".into()));

        let (status, body) = call(&app, Method::POST, "/api/v1/session/hints/0/use", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["applied"], true);
        assert_eq!(body["text"], "Try a color.");
        assert_eq!(body["session"]["submission"], "Try a color.");

        let (_, body) = call(&app, Method::POST, "/api/v1/session/hints/0/use", None).await;
        assert_eq!(body["applied"], false);
        assert!(body.get("text").is_none());
        assert_eq!(state.session.inspect(|st| st.submission.clone()).await, "Try a color.");
    }

    #[tokio::test]
    async fn reset_route_starts_a_new_session() {
        let (app, _) = app(Arc::new(ScriptedApi::new())).await;
        let (_, before) = call(&app, Method::GET, "/api/v1/session", None).await;
        let (status, after) = call(&app, Method::POST, "/api/v1/session/reset", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_ne!(before["session_id"], after["session_id"]);
        assert_eq!(after["attempt_count"], 0);
    }
}
