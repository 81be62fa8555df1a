//! Badge registry: the session's ordered badge set, its tri-state progress and
//! the criteria the player has discovered so far.

use std::collections::BTreeSet;

use crate::domain::{Badge, BadgeScore, EarnedState};
use crate::error::RemoteError;

#[derive(Clone, Debug, Default)]
pub struct BadgeRegistry {
  badges: Vec<Badge>,
  discovered: BTreeSet<String>,
  allow_regression: bool,
}

impl BadgeRegistry {
  pub fn new(allow_regression: bool) -> Self {
    Self { badges: Vec::new(), discovered: BTreeSet::new(), allow_regression }
  }

  /// Install a fresh badge set: everything `Unearned`, nothing discovered.
  pub fn initialize(&mut self, badges: Vec<Badge>) {
    self.badges = badges
      .into_iter()
      .map(|b| Badge { earned: EarnedState::Unearned, granted_hint: false, ..b })
      .collect();
    self.discovered.clear();
  }

  /// Store the latest scores and return the ids of badges that just became
  /// `Full` (were not `Full` before this evaluation). Those ids are added to
  /// the discovered set for good.
  ///
  /// Every badge needs a score; otherwise nothing is changed.
  pub fn apply_evaluation(&mut self, scores: &[BadgeScore]) -> Result<Vec<String>, RemoteError> {
    let mut next = Vec::with_capacity(self.badges.len());
    for badge in &self.badges {
      let score = scores
        .iter()
        .find(|s| s.badge_id == badge.id)
        .ok_or_else(|| RemoteError::decode("evaluate", format!("no score for badge `{}`", badge.id)))?;
      let earned = if self.allow_regression { score.earned } else { score.earned.max(badge.earned) };
      next.push(earned);
    }

    let mut newly = Vec::new();
    for (badge, earned) in self.badges.iter_mut().zip(next) {
      if earned.is_full() && !badge.earned.is_full() {
        newly.push(badge.id.clone());
        self.discovered.insert(badge.id.clone());
      }
      badge.earned = earned;
    }
    Ok(newly)
  }

  /// True iff there is at least one badge and every badge is `Full`.
  pub fn is_session_won(&self) -> bool {
    !self.badges.is_empty() && self.badges.iter().all(|b| b.earned.is_full())
  }

  pub fn badges(&self) -> &[Badge] { &self.badges }

  pub fn get(&self, id: &str) -> Option<&Badge> {
    self.badges.iter().find(|b| b.id == id)
  }

  /// Badges still at `Unearned`; Partial ones are not clue or hint targets.
  pub fn unearned(&self) -> Vec<&Badge> {
    self.badges.iter().filter(|b| b.earned == EarnedState::Unearned).collect()
  }

  pub fn full_ids(&self) -> Vec<String> {
    self.badges.iter().filter(|b| b.earned.is_full()).map(|b| b.id.clone()).collect()
  }

  pub fn is_discovered(&self, id: &str) -> bool { self.discovered.contains(id) }

  pub fn discovered(&self) -> &BTreeSet<String> { &self.discovered }

  /// Flag a badge as having paid out its completion hint. Returns false if it
  /// already had (or does not exist).
  pub fn mark_hint_granted(&mut self, id: &str) -> bool {
    match self.badges.iter_mut().find(|b| b.id == id) {
      Some(b) if !b.granted_hint => {
        b.granted_hint = true;
        true
      }
      _ => false,
    }
  }
}
