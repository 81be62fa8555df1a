//! Timed notices, badge pulses and the inactivity watchdog.
//!
//! Every method takes `now` explicitly; the session passes `Instant::now()`.

use std::{
  collections::HashMap,
  time::{Duration, Instant},
};

use serde::Serialize;

use crate::config::NoticeTimings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
  ClueRevealed,
  Alert,
  HintUnlocked,
  KeepGoing,
  /// Raised by the inactivity watchdog, not by `show`.
  TryAssist,
}

/// Display order; earlier kinds win when a client can only show one.
const PRIORITY: [NoticeKind; 4] = [
  NoticeKind::ClueRevealed,
  NoticeKind::Alert,
  NoticeKind::HintUnlocked,
  NoticeKind::KeepGoing,
];

pub const TRY_ASSIST_MESSAGE: &str = "Stuck? Try an assist.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
  pub kind: NoticeKind,
  pub message: String,
}

#[derive(Clone, Debug)]
struct Slot {
  until: Instant,
  message: String,
}

#[derive(Clone, Debug)]
pub struct NotificationScheduler {
  timings: NoticeTimings,
  slots: HashMap<NoticeKind, Slot>,
  pulses: HashMap<String, Instant>,
  last_activity: Instant,
}

impl NotificationScheduler {
  pub fn new(timings: NoticeTimings, now: Instant) -> Self {
    Self { timings, slots: HashMap::new(), pulses: HashMap::new(), last_activity: now }
  }

  fn duration_of(&self, kind: NoticeKind) -> Duration {
    let ms = match kind {
      NoticeKind::HintUnlocked => self.timings.hint_unlocked_ms,
      NoticeKind::KeepGoing => self.timings.keep_going_ms,
      NoticeKind::ClueRevealed => self.timings.clue_revealed_ms,
      NoticeKind::Alert => self.timings.alert_ms,
      NoticeKind::TryAssist => 0,
    };
    Duration::from_millis(ms)
  }

  /// Show a notice, restarting that kind's timer and replacing its message.
  pub fn show(&mut self, kind: NoticeKind, message: impl Into<String>, now: Instant) {
    if kind == NoticeKind::TryAssist {
      return;
    }
    let until = now + self.duration_of(kind);
    self.slots.insert(kind, Slot { until, message: message.into() });
  }

  pub fn dismiss(&mut self, kind: NoticeKind) {
    self.slots.remove(&kind);
  }

  fn is_live(&self, kind: NoticeKind, now: Instant) -> bool {
    self.slots.get(&kind).is_some_and(|s| now < s.until)
  }

  /// Live notices in priority order. A visible clue hides keep-going.
  pub fn visible(&self, now: Instant) -> Vec<Notice> {
    let clue_live = self.is_live(NoticeKind::ClueRevealed, now);
    PRIORITY
      .iter()
      .filter(|k| !(clue_live && **k == NoticeKind::KeepGoing))
      .filter_map(|k| {
        let slot = self.slots.get(k).filter(|s| now < s.until)?;
        Some(Notice { kind: *k, message: slot.message.clone() })
      })
      .collect()
  }

  /// Keystroke or pointer activity: restart the watchdog.
  pub fn record_activity(&mut self, now: Instant) {
    self.last_activity = now;
  }

  /// The watchdog prompt is due once the idle window has passed while the
  /// draft is empty and the first hint is still unused.
  pub fn assist_prompt_due(&self, now: Instant, draft_empty: bool, first_hint_unused: bool) -> bool {
    let idle = Duration::from_millis(self.timings.idle_assist_ms);
    draft_empty && first_hint_unused && now.saturating_duration_since(self.last_activity) >= idle
  }

  /// Start (or restart) the earned pulse on each badge.
  pub fn pulse<I: IntoIterator<Item = String>>(&mut self, badge_ids: I, now: Instant) {
    let until = now + Duration::from_millis(self.timings.badge_pulse_ms);
    for id in badge_ids {
      self.pulses.insert(id, until);
    }
  }

  pub fn is_pulsing(&self, badge_id: &str, now: Instant) -> bool {
    self.pulses.get(badge_id).is_some_and(|until| now < *until)
  }

  /// Drop expired entries.
  pub fn prune(&mut self, now: Instant) {
    self.slots.retain(|_, s| now < s.until);
    self.pulses.retain(|_, until| now < *until);
  }
}
