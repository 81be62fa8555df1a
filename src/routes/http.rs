//! HTTP endpoint handlers. These are thin wrappers that forward to the session
//! orchestrator and answer with the refreshed session view.

use std::sync::Arc;
use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::error::SessionError;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "debug", skip(state))]
pub async fn http_get_session(State(state): State<Arc<AppState>>) -> Json<SessionView> {
  Json(state.session.view().await)
}

#[instrument(level = "debug", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_put_draft(
  State(state): State<Arc<AppState>>,
  Json(body): Json<DraftIn>,
) -> Result<StatusCode, SessionError> {
  state.session.edit(body.text).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "debug", skip(state))]
pub async fn http_post_activity(State(state): State<Arc<AppState>>) -> StatusCode {
  state.session.record_activity().await;
  StatusCode::NO_CONTENT
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_submit(State(state): State<Arc<AppState>>) -> Result<Json<SubmitOut>, SessionError> {
  let outcome = state.session.submit().await?;
  info!(target: "session", attempt = outcome.attempt_count, won = outcome.won, "HTTP submission scored");
  Ok(Json(SubmitOut { outcome, session: state.session.view().await }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_use_hint(
  State(state): State<Arc<AppState>>,
  Path(index): Path<usize>,
) -> Result<Json<HintUseOut>, SessionError> {
  let used = state.session.use_hint(index).await?;
  Ok(Json(HintUseOut::new(used, state.session.view().await)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_keep_editing(State(state): State<Arc<AppState>>) -> Result<Json<SessionView>, SessionError> {
  state.session.keep_editing().await?;
  Ok(Json(state.session.view().await))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_dismiss_feedback(State(state): State<Arc<AppState>>) -> Json<SessionView> {
  state.session.dismiss_feedback().await;
  Json(state.session.view().await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_reset(State(state): State<Arc<AppState>>) -> Result<Json<SessionView>, SessionError> {
  state.session.reset().await?;
  info!(target: "session", "HTTP session reset");
  Ok(Json(state.session.view().await))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_share(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, SessionError> {
  let card = state.session.share().await?;
  Ok(Json(card))
}
