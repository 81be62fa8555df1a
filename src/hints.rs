//! Hint economy: a capped pool of single-use assists, each bound to one badge.
//!
//! A hint is created pending (no text), gets its text from the evaluation
//! service when the player uses it, and is consumed exactly once. The remote
//! call itself is made by the session; this module only tracks the slots and
//! the single in-flight use.

use rand::{seq::SliceRandom, Rng};
use serde::Serialize;

use crate::domain::Badge;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Hint {
  pub text: String,
  pub is_used: bool,
  pub target_badge_id: String,
}

impl Hint {
  fn pending(target_badge_id: String) -> Self {
    Self { text: String::new(), is_used: false, target_badge_id }
  }
}

#[derive(Clone, Debug)]
pub struct HintEconomy {
  hints: Vec<Hint>,
  max_hints: usize,
  in_flight: Option<usize>,
}

impl HintEconomy {
  pub fn new(max_hints: usize) -> Self {
    Self { hints: Vec::new(), max_hints, in_flight: None }
  }

  /// The free hint handed out at session start, aimed at any badge.
  pub fn grant_initial_hint<R: Rng + ?Sized>(&mut self, badges: &[Badge], rng: &mut R) -> Option<usize> {
    if !self.hints.is_empty() {
      return None;
    }
    let refs: Vec<&Badge> = badges.iter().collect();
    self.push_targeted(&refs, rng)
  }

  /// Add a pending hint aimed at a random unearned badge. Silently does
  /// nothing at the cap or when there is nothing left to aim at.
  pub fn request_hint<R: Rng + ?Sized>(&mut self, unearned: &[&Badge], rng: &mut R) -> Option<usize> {
    self.push_targeted(unearned, rng)
  }

  fn push_targeted<R: Rng + ?Sized>(&mut self, candidates: &[&Badge], rng: &mut R) -> Option<usize> {
    if self.hints.len() >= self.max_hints {
      return None;
    }
    let target = candidates.choose(rng)?;
    self.hints.push(Hint::pending(target.id.clone()));
    Some(self.hints.len() - 1)
  }

  /// Claim hint `index` for use. Returns its target badge id, or `None` if
  /// the hint does not exist, is already used, or a use is already in flight.
  pub fn begin_use(&mut self, index: usize) -> Option<String> {
    if self.in_flight.is_some() {
      return None;
    }
    let hint = self.hints.get(index).filter(|h| !h.is_used)?;
    let target = hint.target_badge_id.clone();
    self.in_flight = Some(index);
    Some(target)
  }

  /// Store the generated text and consume the hint.
  pub fn complete_use(&mut self, index: usize, text: String) {
    if self.in_flight == Some(index) {
      self.in_flight = None;
    }
    if let Some(hint) = self.hints.get_mut(index) {
      hint.text = text;
      hint.is_used = true;
    }
  }

  /// Release a claimed hint after a failed call; it stays unused.
  pub fn abort_use(&mut self, index: usize) {
    if self.in_flight == Some(index) {
      self.in_flight = None;
    }
  }

  pub fn hints(&self) -> &[Hint] { &self.hints }

  pub fn max_hints(&self) -> usize { self.max_hints }

  pub fn in_flight(&self) -> Option<usize> { self.in_flight }

  /// True when hint 0 exists and has not been used.
  pub fn first_hint_unused(&self) -> bool {
    self.hints.first().is_some_and(|h| !h.is_used)
  }
}
