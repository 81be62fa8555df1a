//! Client for the remote evaluation service.
//!
//! Shapes the five calls of the service (prompt, badges, evaluate, hint, share
//! card) and decodes their answers into domain types. No retries: every
//! failure comes back as one `RemoteError`. Calls log operation names,
//! latencies and payload sizes (never the user's text).

use std::{collections::HashMap, time::Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::config::GameConfig;
use crate::domain::{Badge, BadgeScore, EarnedState, Evaluation, ShareCard, WritingPrompt};
use crate::error::{RemoteError, RemoteErrorKind};
use crate::util::trunc_for_log;

const CLIENT_UA: &str = "mystery-badges/0.1";

/// The operations the session needs from the evaluation service.
#[async_trait]
pub trait EvaluationApi: Send + Sync {
  async fn fetch_prompt(&self) -> Result<WritingPrompt, RemoteError>;

  /// Badges come back `Unearned` with no hint granted.
  async fn fetch_badges(&self, prompt_id: &str) -> Result<Vec<Badge>, RemoteError>;

  /// One score per badge, in badge order.
  async fn evaluate(&self, text: &str, prompt: &WritingPrompt, badges: &[Badge]) -> Result<Evaluation, RemoteError>;

  async fn generate_hint(&self, text: &str, prompt: &WritingPrompt, targets: &[Badge]) -> Result<String, RemoteError>;

  async fn generate_share_card(
    &self,
    text: &str,
    prompt: &WritingPrompt,
    badges: &[Badge],
    attempts: u32,
  ) -> Result<ShareCard, RemoteError>;
}

/// HTTP implementation of [`EvaluationApi`].
#[derive(Clone)]
pub struct EvaluationClient {
  pub client: reqwest::Client,
  pub base_url: String,
}

impl EvaluationClient {
  pub fn new(cfg: &GameConfig) -> Result<Self, RemoteError> {
    let client = reqwest::Client::builder()
      .timeout(cfg.request_timeout())
      .build()
      .map_err(|e| RemoteError::transport("build_client", e))?;
    Ok(Self { client, base_url: cfg.api_base_url.trim_end_matches('/').to_string() })
  }

  #[instrument(level = "debug", target = "remote", skip(self, query))]
  async fn get_json<T: DeserializeOwned>(
    &self,
    operation: &'static str,
    path: &str,
    query: &[(&str, &str)],
  ) -> Result<T, RemoteError> {
    let url = format!("{}{}", self.base_url, path);
    let start = Instant::now();
    let res = self.client.get(&url)
      .header(USER_AGENT, CLIENT_UA)
      .query(query)
      .send().await
      .map_err(|e| RemoteError::transport(operation, e))?;
    read_json(operation, res, start).await
  }

  #[instrument(level = "debug", target = "remote", skip(self, body))]
  async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
    &self,
    operation: &'static str,
    path: &str,
    body: &B,
  ) -> Result<T, RemoteError> {
    let url = format!("{}{}", self.base_url, path);
    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, CLIENT_UA)
      .header(CONTENT_TYPE, "application/json")
      .json(body)
      .send().await
      .map_err(|e| RemoteError::transport(operation, e))?;
    read_json(operation, res, start).await
  }
}

async fn read_json<T: DeserializeOwned>(
  operation: &'static str,
  res: reqwest::Response,
  start: Instant,
) -> Result<T, RemoteError> {
  let status = res.status();
  let body = res.text().await.map_err(|e| RemoteError::transport(operation, e))?;
  let elapsed = start.elapsed();

  if !status.is_success() {
    let msg = extract_service_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
    error!(target: "remote", operation, %status, ?elapsed, "Evaluation service returned an error status");
    return Err(RemoteError::new(RemoteErrorKind::Status, operation, format!("HTTP {}: {}", status, msg)));
  }

  info!(target: "remote", operation, ?elapsed, body_len = body.len(), "Evaluation service responded");
  serde_json::from_str::<T>(&body).map_err(|e| {
    debug!(target: "remote", operation, body = %trunc_for_log(&body, 200), "Undecodable response body");
    RemoteError::decode(operation, e)
  })
}

/// Pull a readable message out of a FastAPI-style (`detail`) or generic (`error`) error body.
fn extract_service_error(body: &str) -> Option<String> {
  let v: Value = serde_json::from_str(body).ok()?;
  ["detail", "error", "message"].iter().find_map(|k| match v.get(*k)? {
    Value::String(s) => Some(s.clone()),
    Value::Null => None,
    other => Some(other.to_string()),
  })
}

/// Decode one `earned` value. Canonical form is the numeric string "0" | "1" |
/// "2"; bare integers are accepted, and the legacy boolean form maps to
/// Full/Unearned.
pub fn decode_earned(v: &Value) -> Option<EarnedState> {
  match v {
    Value::String(s) => {
      let s = s.trim();
      if let Ok(n) = s.parse::<u64>() {
        return EarnedState::from_score(n);
      }
      match s.to_ascii_lowercase().as_str() {
        "true" => Some(legacy(true)),
        "false" => Some(legacy(false)),
        _ => None,
      }
    }
    Value::Number(n) => n.as_u64().and_then(EarnedState::from_score),
    Value::Bool(b) => Some(legacy(*b)),
    _ => None,
  }
}

fn legacy(b: bool) -> EarnedState {
  warn!(target: "remote", value = b, "Legacy boolean badge score; mapping to Full/Unearned");
  if b { EarnedState::Full } else { EarnedState::Unearned }
}

/// Map the `badge_<n>` keyed evaluate response onto the badges that were sent.
/// All-or-nothing: one missing or undecodable entry rejects the whole response.
pub fn decode_evaluation(badges: &[Badge], raw: &HashMap<String, Value>) -> Result<Evaluation, RemoteError> {
  let mut scores = Vec::with_capacity(badges.len());
  for (i, badge) in badges.iter().enumerate() {
    let key = format!("badge_{}", i + 1);
    let entry = raw
      .get(&key)
      .ok_or_else(|| RemoteError::decode("evaluate", format!("missing `{}`", key)))?;
    let earned_raw = entry
      .get("earned")
      .ok_or_else(|| RemoteError::decode("evaluate", format!("`{}` has no `earned`", key)))?;
    let earned = decode_earned(earned_raw)
      .ok_or_else(|| RemoteError::decode("evaluate", format!("`{}.earned` is not 0, 1 or 2: {}", key, earned_raw)))?;
    scores.push(BadgeScore { badge_id: badge.id.clone(), earned });
  }

  let final_feedback = match raw.get("final_feedback") {
    Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
    _ => None,
  };
  Ok(Evaluation { scores, final_feedback })
}

#[async_trait]
impl EvaluationApi for EvaluationClient {
  #[instrument(level = "info", target = "remote", skip(self))]
  async fn fetch_prompt(&self) -> Result<WritingPrompt, RemoteError> {
    let out: WritingTypeOut = self.get_json("writing-type", "/writing-type", &[]).await?;
    Ok(out.writing_type)
  }

  #[instrument(level = "info", target = "remote", skip(self))]
  async fn fetch_badges(&self, prompt_id: &str) -> Result<Vec<Badge>, RemoteError> {
    let out: BadgesOut = self
      .get_json("generate-badges", "/generate-badges", &[("writing_type_id", prompt_id)])
      .await?;
    if out.badges.is_empty() {
      return Err(RemoteError::decode("generate-badges", "service returned no badges"));
    }
    Ok(out.badges.into_iter().map(|b| Badge::new(b.id, b.name, b.criteria, b.icon, b.clue)).collect())
  }

  #[instrument(level = "info", target = "remote", skip(self, text, prompt, badges), fields(text_len = text.len(), badges = badges.len()))]
  async fn evaluate(&self, text: &str, prompt: &WritingPrompt, badges: &[Badge]) -> Result<Evaluation, RemoteError> {
    let body = EvaluateIn {
      submission: text,
      writing_type: prompt,
      badges: badges
        .iter()
        .enumerate()
        .map(|(i, b)| EvaluateBadgeIn { id: &b.id, name: &b.name, criteria: &b.criteria, badge_number: i + 1 })
        .collect(),
    };
    let raw: HashMap<String, Value> = self.post_json("evaluate", "/evaluate", &body).await?;
    decode_evaluation(badges, &raw)
  }

  #[instrument(level = "info", target = "remote", skip(self, text, prompt, targets), fields(text_len = text.len(), targets = targets.len()))]
  async fn generate_hint(&self, text: &str, prompt: &WritingPrompt, targets: &[Badge]) -> Result<String, RemoteError> {
    let body = HintIn {
      submission: text,
      writing_type: prompt,
      badges: targets.iter().map(WireBadgeRef::from).collect(),
    };
    let out: HintOut = self.post_json("get-hint", "/get-hint", &body).await?;
    let hint = out.hint.trim().to_string();
    if hint.is_empty() {
      return Err(RemoteError::decode("get-hint", "empty hint"));
    }
    Ok(hint)
  }

  #[instrument(level = "info", target = "remote", skip(self, text, prompt, badges), fields(text_len = text.len()))]
  async fn generate_share_card(
    &self,
    text: &str,
    prompt: &WritingPrompt,
    badges: &[Badge],
    attempts: u32,
  ) -> Result<ShareCard, RemoteError> {
    let body = ShareIn {
      submission: text,
      writing_type: prompt,
      badges: badges.iter().map(|b| ShareBadgeIn { icon: &b.icon, name: &b.name }).collect(),
      attempts,
    };
    let out: ShareOut = self.post_json("share-image", "/share-image", &body).await?;
    if out.url.is_none() && out.fallback.is_none() {
      return Err(RemoteError::decode("share-image", "neither url nor fallback in response"));
    }
    Ok(ShareCard { url: out.url, fallback_text: out.fallback })
  }
}

// --- Wire DTOs ---

#[derive(Deserialize)]
struct WritingTypeOut {
  #[serde(rename = "writingType")]
  writing_type: WritingPrompt,
}

#[derive(Deserialize)]
struct BadgesOut {
  badges: Vec<WireBadge>,
}

#[derive(Deserialize)]
struct WireBadge {
  id: String,
  name: String,
  criteria: String,
  icon: String,
  #[serde(default)]
  clue: String,
}

#[derive(Serialize)]
struct WireBadgeRef<'a> {
  id: &'a str,
  name: &'a str,
  criteria: &'a str,
  icon: &'a str,
  clue: &'a str,
}

impl<'a> From<&'a Badge> for WireBadgeRef<'a> {
  fn from(b: &'a Badge) -> Self {
    Self { id: &b.id, name: &b.name, criteria: &b.criteria, icon: &b.icon, clue: &b.clue }
  }
}

#[derive(Serialize)]
struct EvaluateIn<'a> {
  submission: &'a str,
  #[serde(rename = "writingType")]
  writing_type: &'a WritingPrompt,
  badges: Vec<EvaluateBadgeIn<'a>>,
}

#[derive(Serialize)]
struct EvaluateBadgeIn<'a> {
  id: &'a str,
  name: &'a str,
  criteria: &'a str,
  badge_number: usize,
}

#[derive(Serialize)]
struct HintIn<'a> {
  submission: &'a str,
  #[serde(rename = "writingType")]
  writing_type: &'a WritingPrompt,
  badges: Vec<WireBadgeRef<'a>>,
}

#[derive(Deserialize)]
struct HintOut {
  hint: String,
}

#[derive(Serialize)]
struct ShareIn<'a> {
  submission: &'a str,
  #[serde(rename = "writingType")]
  writing_type: &'a WritingPrompt,
  badges: Vec<ShareBadgeIn<'a>>,
  attempts: u32,
}

#[derive(Serialize)]
struct ShareBadgeIn<'a> {
  icon: &'a str,
  name: &'a str,
}

#[derive(Deserialize)]
struct ShareOut {
  #[serde(default)]
  url: Option<String>,
  #[serde(default)]
  fallback: Option<String>,
}
