//! Domain models: writing prompt, badges with tri-state progress, evaluation results, share card.

use serde::{Deserialize, Serialize};

/// The task the user writes against. Fixed for the lifetime of a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritingPrompt {
  pub id: String,
  #[serde(rename = "prompt")]
  pub prompt_text: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

/// Tri-state score of a badge for the latest evaluated submission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarnedState {
  #[default]
  Unearned,
  Partial,
  Full,
}

impl EarnedState {
  pub fn from_score(score: u64) -> Option<Self> {
    match score {
      0 => Some(Self::Unearned),
      1 => Some(Self::Partial),
      2 => Some(Self::Full),
      _ => None,
    }
  }

  pub fn score(self) -> u8 {
    match self {
      Self::Unearned => 0,
      Self::Partial => 1,
      Self::Full => 2,
    }
  }

  pub fn is_full(self) -> bool { self == Self::Full }
}

/// A hidden scoring criterion. `criteria` and `clue` stay server-side in views
/// until the badge is discovered or its clue is revealed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Badge {
  pub id: String,
  pub name: String,
  pub criteria: String,
  pub icon: String,
  pub clue: String,
  pub earned: EarnedState,
  /// Set once this badge has paid out its completion hint.
  pub granted_hint: bool,
}

impl Badge {
  pub fn new(
    id: impl Into<String>,
    name: impl Into<String>,
    criteria: impl Into<String>,
    icon: impl Into<String>,
    clue: impl Into<String>,
  ) -> Self {
    Self {
      id: id.into(),
      name: name.into(),
      criteria: criteria.into(),
      icon: icon.into(),
      clue: clue.into(),
      earned: EarnedState::Unearned,
      granted_hint: false,
    }
  }
}

/// Score for one badge as returned by the evaluation service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BadgeScore {
  pub badge_id: String,
  pub earned: EarnedState,
}

/// Full result of one evaluation call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Evaluation {
  pub scores: Vec<BadgeScore>,
  pub final_feedback: Option<String>,
}

/// Share card returned by the remote renderer. Either field may be missing;
/// with no url the client falls back to copying `fallback_text`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ShareCard {
  pub url: Option<String>,
  pub fallback_text: Option<String>,
}
