//! Attempt tracking and clue escalation.

use rand::{seq::SliceRandom, Rng};
use serde::Serialize;

use crate::domain::Badge;

/// Follow-up signal for a scored submission that did not win the session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Signal {
  /// Generic encouragement after a submission with no new badge.
  KeepGoing,
  /// The no-progress streak hit the threshold: reveal one unearned badge's clue.
  Clue { badge_id: String, clue: String },
}

#[derive(Clone, Debug)]
pub struct AttemptTracker {
  attempt_count: u32,
  no_progress_streak: u32,
  clue_streak: u32,
}

impl AttemptTracker {
  pub fn new(clue_streak: u32) -> Self {
    Self { attempt_count: 0, no_progress_streak: 0, clue_streak: clue_streak.max(1) }
  }

  /// Account for one evaluated submission.
  ///
  /// `newly_completed` is the number of badges that just became Full, `won`
  /// whether the session is now won, and `unearned` the badges still at
  /// Unearned (clue candidates).
  pub fn record<R: Rng + ?Sized>(
    &mut self,
    newly_completed: usize,
    won: bool,
    unearned: &[&Badge],
    rng: &mut R,
  ) -> Option<Signal> {
    self.attempt_count += 1;

    if won || newly_completed > 0 {
      self.no_progress_streak = 0;
      return None;
    }

    self.no_progress_streak += 1;
    if self.no_progress_streak >= self.clue_streak {
      self.no_progress_streak = 0;
      if let Some(badge) = unearned.choose(rng) {
        return Some(Signal::Clue { badge_id: badge.id.clone(), clue: badge.clue.clone() });
      }
    }
    Some(Signal::KeepGoing)
  }

  pub fn attempt_count(&self) -> u32 { self.attempt_count }

  pub fn no_progress_streak(&self) -> u32 { self.no_progress_streak }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::{rngs::StdRng, SeedableRng};

  fn unearned() -> Vec<Badge> {
    vec![
      Badge::new("badge_1", "Metaphor", "c", "🌈", "Show things in a new light."),
      Badge::new("badge_3", "Sound", "c", "🔊", "Listen closely."),
    ]
  }

  #[test]
  fn third_empty_submission_reveals_a_clue_and_resets() {
    let mut rng = StdRng::seed_from_u64(9);
    let bs = unearned();
    let refs: Vec<&Badge> = bs.iter().collect();
    let mut t = AttemptTracker::new(3);

    assert_eq!(t.record(0, false, &refs, &mut rng), Some(Signal::KeepGoing));
    assert_eq!(t.record(0, false, &refs, &mut rng), Some(Signal::KeepGoing));
    match t.record(0, false, &refs, &mut rng) {
      Some(Signal::Clue { badge_id, clue }) => {
        let b = bs.iter().find(|b| b.id == badge_id).unwrap();
        assert_eq!(clue, b.clue);
      }
      other => panic!("expected a clue, got {:?}", other),
    }
    assert_eq!(t.no_progress_streak(), 0);

    // A fourth fruitless submission starts a new streak.
    assert_eq!(t.record(0, false, &refs, &mut rng), Some(Signal::KeepGoing));
    assert_eq!(t.no_progress_streak(), 1);
    assert_eq!(t.attempt_count(), 4);
  }

  #[test]
  fn progress_resets_the_streak_without_a_signal() {
    let mut rng = StdRng::seed_from_u64(1);
    let bs = unearned();
    let refs: Vec<&Badge> = bs.iter().collect();
    let mut t = AttemptTracker::new(3);
    t.record(0, false, &refs, &mut rng);
    t.record(0, false, &refs, &mut rng);
    assert_eq!(t.record(1, false, &refs, &mut rng), None);
    assert_eq!(t.no_progress_streak(), 0);
  }

  #[test]
  fn winning_never_signals_and_still_counts() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut t = AttemptTracker::new(3);
    t.record(0, false, &[], &mut rng);
    t.record(0, false, &[], &mut rng);
    assert_eq!(t.record(0, true, &[], &mut rng), None);
    assert_eq!(t.attempt_count(), 3);
    assert_eq!(t.no_progress_streak(), 0);
  }

  #[test]
  fn clue_with_no_candidates_falls_back_to_keep_going() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut t = AttemptTracker::new(1);
    assert_eq!(t.record(0, false, &[], &mut rng), Some(Signal::KeepGoing));
    assert_eq!(t.no_progress_streak(), 0);
  }
}
