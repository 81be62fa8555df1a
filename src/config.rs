//! Game configuration: remote service location, hint cap, clue threshold and notice timings.
//!
//! Values come from an optional TOML file (GAME_CONFIG_PATH), then
//! EVAL_API_URL overrides the remote base URL. Every field has a default, so
//! a partial file (or none at all) is fine:
//!
//! ```toml
//! api_base_url = "http://localhost:8000"
//! max_hints = 3
//! allow_regression = false
//!
//! [notices]
//! clue_revealed_ms = 6000
//! ```

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GameConfig {
  /// Base URL of the evaluation service.
  pub api_base_url: String,
  pub request_timeout_secs: u64,
  /// Total hints per session, the free starting hint included.
  pub max_hints: usize,
  /// Consecutive no-progress submissions before a clue is revealed.
  pub clue_streak: u32,
  /// When false a badge that reached Full never drops back below Full.
  pub allow_regression: bool,
  pub notices: NoticeTimings,
}

impl Default for GameConfig {
  fn default() -> Self {
    Self {
      api_base_url: DEFAULT_API_BASE_URL.into(),
      request_timeout_secs: 20,
      max_hints: 2,
      clue_streak: 3,
      allow_regression: true,
      notices: NoticeTimings::default(),
    }
  }
}

impl GameConfig {
  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }
}

/// Visible durations of the timed notices, in milliseconds.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NoticeTimings {
  pub hint_unlocked_ms: u64,
  pub keep_going_ms: u64,
  pub clue_revealed_ms: u64,
  pub alert_ms: u64,
  pub badge_pulse_ms: u64,
  /// Inactivity window before the "try an assist" prompt.
  pub idle_assist_ms: u64,
}

impl Default for NoticeTimings {
  fn default() -> Self {
    Self {
      hint_unlocked_ms: 2_000,
      keep_going_ms: 3_000,
      clue_revealed_ms: 5_000,
      alert_ms: 4_000,
      badge_pulse_ms: 1_000,
      idle_assist_ms: 8_000,
    }
  }
}

/// Parse a TOML document into a config. Missing keys keep their defaults.
pub fn parse_game_config(s: &str) -> Result<GameConfig, toml::de::Error> {
  toml::from_str::<GameConfig>(s)
}

/// Load from GAME_CONFIG_PATH (if set) and apply EVAL_API_URL. On any IO or
/// parse error the defaults are used and the problem is logged.
pub fn load_game_config_from_env() -> GameConfig {
  let mut cfg = match std::env::var("GAME_CONFIG_PATH") {
    Ok(path) => match std::fs::read_to_string(&path) {
      Ok(s) => match parse_game_config(&s) {
        Ok(cfg) => {
          info!(target: "mystery_badges", %path, "Loaded game config (TOML)");
          cfg
        }
        Err(e) => {
          error!(target: "mystery_badges", %path, error = %e, "Failed to parse TOML config; using defaults");
          GameConfig::default()
        }
      },
      Err(e) => {
        error!(target: "mystery_badges", %path, error = %e, "Failed to read TOML config file; using defaults");
        GameConfig::default()
      }
    },
    Err(_) => GameConfig::default(),
  };

  if let Ok(url) = std::env::var("EVAL_API_URL") {
    if !url.trim().is_empty() {
      cfg.api_base_url = url.trim().to_string();
    }
  }
  cfg.api_base_url = cfg.api_base_url.trim_end_matches('/').to_string();
  cfg
}
