//! Mystery Badges · writing-practice session backend
//!
//! - Axum HTTP + WebSocket API over a single game session
//! - Remote evaluation service for prompts, badges, scoring, hints, share cards
//! - Static SPA fallback (STATIC_DIR/index.html)
//!
//! Important env variables:
//!   PORT             : u16 (default 3000)
//!   EVAL_API_URL     : evaluation service base URL (default "http://localhost:8000")
//!   GAME_CONFIG_PATH : path to TOML game config (hint cap, clue streak, timings)
//!   STATIC_DIR       : frontend bundle directory (default "./static")
//!   LOG_LEVEL        : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT       : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod error;
mod client;
mod badges;
mod hints;
mod attempts;
mod notify;
mod session;
mod state;
mod protocol;
mod routes;
#[cfg(test)]
mod testing;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info, instrument};

use crate::client::EvaluationClient;
use crate::config::load_game_config_from_env;
use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let cfg = load_game_config_from_env();
  let api = Arc::new(EvaluationClient::new(&cfg)?);
  let state = Arc::new(AppState::from_env(api, cfg));

  // Fetch prompt and badges in the background; early requests see Initializing.
  tokio::spawn({
    let state = state.clone();
    async move {
      if let Err(e) = state.session.initialize().await {
        error!(target: "mystery_badges", error = %e, "Initial session setup failed; reset to retry");
      }
    }
  });

  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "mystery_badges", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

  state.session.teardown().await;
  info!(target: "mystery_badges", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!(target: "mystery_badges", error = %e, "Failed to listen for Ctrl-C");
    std::future::pending::<()>().await;
  }
  info!(target: "mystery_badges", "Shutdown requested");
}
