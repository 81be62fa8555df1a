//! Application state shared by every route: the session orchestrator plus the
//! location of the frontend bundle.
//!
//! One process serves one writing session. Clients on any connection see and
//! drive the same session.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::client::EvaluationApi;
use crate::config::GameConfig;
use crate::session::SessionOrchestrator;

pub const DEFAULT_STATIC_DIR: &str = "./static";

pub struct AppState {
    pub session: SessionOrchestrator,
    pub static_dir: String,
}

impl AppState {
    pub fn new(api: Arc<dyn EvaluationApi>, cfg: GameConfig, static_dir: impl Into<String>) -> Self {
        Self { session: SessionOrchestrator::new(api, cfg), static_dir: static_dir.into() }
    }

    /// Build state with the static directory taken from `STATIC_DIR`.
    #[instrument(level = "info", skip_all)]
    pub fn from_env(api: Arc<dyn EvaluationApi>, cfg: GameConfig) -> Self {
        let static_dir = std::env::var("STATIC_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string());
        info!(
            target: "mystery_badges",
            api_base_url = %cfg.api_base_url,
            max_hints = cfg.max_hints,
            clue_streak = cfg.clue_streak,
            allow_regression = cfg.allow_regression,
            %static_dir,
            "Application state built"
        );
        Self::new(api, cfg, static_dir)
    }
}
