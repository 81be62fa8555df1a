//! Session orchestrator: the state machine of one writing session.
//!
//! This module owns:
//!   - the session state (prompt, badges, hints, attempts, draft, notices)
//!   - the initialization single-flight guard
//!   - submission flow, win detection, hint use, share, reset
//!
//! Phases: Initializing -> Ready -> Evaluating -> (Ready | Won). A failed
//! initialization parks the session in Unavailable until it is reset.
//!
//! The state lock is never held across a remote call. Before each call we
//! capture the session generation; afterwards a response is applied only if
//! the generation (and, for evaluations, the phase) still matches. A reset in
//! between bumps the generation, so late responses are dropped.

use std::{
  fmt, mem,
  sync::{Arc, Mutex},
  time::Instant,
};

use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::attempts::{AttemptTracker, Signal};
use crate::badges::BadgeRegistry;
use crate::client::EvaluationApi;
use crate::config::GameConfig;
use crate::domain::{Badge, ShareCard, WritingPrompt};
use crate::error::{RemoteError, SessionError};
use crate::hints::HintEconomy;
use crate::notify::{NoticeKind, NotificationScheduler};
use crate::protocol::SessionView;
use crate::util::{append_hint_line, is_blank};

pub const HINT_UNLOCKED_MESSAGE: &str = "New hint unlocked!";
pub const KEEP_GOING_MESSAGE: &str = "Keep going! Try adding more detail or creativity to earn badges.";
const EVALUATION_FAILED_MESSAGE: &str = "Failed to evaluate submission. Please try again.";
const HINT_FAILED_MESSAGE: &str = "Failed to get hint. Please try again.";
const SHARE_FAILED_MESSAGE: &str = "Could not create a share card.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  Initializing,
  Ready,
  Evaluating,
  Won,
  /// Initialization failed; nothing to play until a reset.
  Unavailable,
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Self::Initializing => "initializing",
      Self::Ready => "ready",
      Self::Evaluating => "evaluating",
      Self::Won => "won",
      Self::Unavailable => "unavailable",
    };
    f.write_str(s)
  }
}

/// Remote data a session starts from.
#[derive(Clone, Debug)]
struct SessionSeed {
  prompt: WritingPrompt,
  badges: Vec<Badge>,
}

type InitResult = Result<SessionSeed, RemoteError>;

/// One in-flight (or finished) init sequence, shared by every caller of the
/// same generation.
struct InitFlight {
  generation: u64,
  cell: Arc<OnceCell<InitResult>>,
}

pub struct SessionState {
  pub session_id: Uuid,
  pub generation: u64,
  pub phase: Phase,
  pub prompt: Option<WritingPrompt>,
  pub registry: BadgeRegistry,
  pub hints: HintEconomy,
  pub attempts: AttemptTracker,
  pub notices: NotificationScheduler,
  pub submission: String,
  pub final_feedback: Option<String>,
  pub last_error: Option<String>,
  rng: StdRng,
}

impl SessionState {
  fn fresh(generation: u64, cfg: &GameConfig, rng: StdRng, now: Instant) -> Self {
    Self {
      session_id: Uuid::new_v4(),
      generation,
      phase: Phase::Initializing,
      prompt: None,
      registry: BadgeRegistry::new(cfg.allow_regression),
      hints: HintEconomy::new(cfg.max_hints),
      attempts: AttemptTracker::new(cfg.clue_streak),
      notices: NotificationScheduler::new(cfg.notices.clone(), now),
      submission: String::new(),
      final_feedback: None,
      last_error: None,
      rng,
    }
  }

  fn loaded_prompt(&self, action: &'static str) -> Result<WritingPrompt, SessionError> {
    self.prompt.clone().ok_or(SessionError::WrongPhase { action, phase: self.phase })
  }
}

/// What one scored submission produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubmitOutcome {
  pub attempt_count: u32,
  /// Badges that became Full with this submission.
  pub newly_completed: Vec<String>,
  /// Every badge currently Full; each gets the earned pulse.
  pub pulsing: Vec<String>,
  pub won: bool,
  pub signal: Option<Signal>,
  pub hints_granted: usize,
  pub final_feedback: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HintUse {
  /// The hint text was appended to the draft.
  Applied { index: usize, text: String },
  /// Missing, already used, or another hint is in flight.
  Ignored,
}

pub struct SessionOrchestrator {
  api: Arc<dyn EvaluationApi>,
  cfg: GameConfig,
  state: RwLock<SessionState>,
  init_flight: Mutex<Option<InitFlight>>,
}

impl SessionOrchestrator {
  pub fn new(api: Arc<dyn EvaluationApi>, cfg: GameConfig) -> Self {
    Self::with_rng(api, cfg, StdRng::from_entropy())
  }

  /// Same as `new` with a caller-supplied random source for badge picks.
  pub fn with_rng(api: Arc<dyn EvaluationApi>, cfg: GameConfig, rng: StdRng) -> Self {
    let state = SessionState::fresh(0, &cfg, rng, Instant::now());
    Self { api, cfg, state: RwLock::new(state), init_flight: Mutex::new(None) }
  }

  /// Read access to the current state.
  pub async fn inspect<T>(&self, f: impl FnOnce(&SessionState) -> T) -> T {
    let st = self.state.read().await;
    f(&st)
  }

  /// The shared init cell for `generation`, created on first access.
  fn flight_for(&self, generation: u64) -> Arc<OnceCell<InitResult>> {
    let mut guard = self.init_flight.lock().unwrap_or_else(|p| p.into_inner());
    match guard.as_ref() {
      Some(flight) if flight.generation == generation => flight.cell.clone(),
      _ => {
        let cell = Arc::new(OnceCell::new());
        *guard = Some(InitFlight { generation, cell: cell.clone() });
        cell
      }
    }
  }

  fn release_init_guard(&self) {
    let mut guard = self.init_flight.lock().unwrap_or_else(|p| p.into_inner());
    guard.take();
  }

  /// Fetch prompt and badges, hand out the free hint, become Ready.
  ///
  /// Any number of concurrent callers for the same session share a single
  /// fetch sequence and all observe its result. A failure leaves the session
  /// Unavailable; it is not retried until `reset`.
  #[instrument(level = "info", target = "session", skip(self))]
  pub async fn initialize(&self) -> Result<(), SessionError> {
    let generation = self.state.read().await.generation;
    let cell = self.flight_for(generation);
    let api = self.api.clone();
    let outcome = cell.get_or_init(|| fetch_seed(api)).await.clone();

    let mut guard = self.state.write().await;
    let st = &mut *guard;
    if st.generation != generation {
      debug!(target: "session", generation, current = st.generation, "Init result for a torn-down session dropped");
      return Err(SessionError::Superseded);
    }

    if st.phase == Phase::Initializing {
      match &outcome {
        Ok(seed) => {
          st.registry.initialize(seed.badges.clone());
          st.hints.grant_initial_hint(st.registry.badges(), &mut st.rng);
          st.prompt = Some(seed.prompt.clone());
          st.notices.record_activity(Instant::now());
          st.phase = Phase::Ready;
          info!(
            target: "session",
            session_id = %st.session_id,
            prompt_id = %seed.prompt.id,
            badges = seed.badges.len(),
            "Session ready"
          );
        }
        Err(e) => {
          st.phase = Phase::Unavailable;
          st.last_error = Some(e.to_string());
          error!(target: "session", session_id = %st.session_id, error = %e, "Session initialization failed");
        }
      }
    }

    outcome.map(|_| ()).map_err(SessionError::Initialization)
  }

  /// Replace the draft. Counts as keyboard activity for the watchdog.
  pub async fn edit(&self, text: String) -> Result<(), SessionError> {
    let mut st = self.state.write().await;
    if matches!(st.phase, Phase::Initializing | Phase::Unavailable) {
      return Err(SessionError::WrongPhase { action: "edit", phase: st.phase });
    }
    st.submission = text;
    st.notices.record_activity(Instant::now());
    Ok(())
  }

  /// Pointer activity: restarts the inactivity watchdog.
  pub async fn record_activity(&self) {
    self.state.write().await.notices.record_activity(Instant::now());
  }

  /// Score the current draft and apply the result.
  #[instrument(level = "info", target = "session", skip(self))]
  pub async fn submit(&self) -> Result<SubmitOutcome, SessionError> {
    let (generation, text, prompt, badges) = {
      let mut guard = self.state.write().await;
      let st = &mut *guard;
      if st.phase != Phase::Ready {
        return Err(SessionError::WrongPhase { action: "submit", phase: st.phase });
      }
      if is_blank(&st.submission) {
        return Err(SessionError::EmptySubmission);
      }
      let prompt = st.loaded_prompt("submit")?;
      st.phase = Phase::Evaluating;
      (st.generation, st.submission.clone(), prompt, st.registry.badges().to_vec())
    };

    debug!(target: "session", generation, text_len = text.len(), "Submitting draft for evaluation");
    let result = self.api.evaluate(&text, &prompt, &badges).await;

    let mut guard = self.state.write().await;
    let st = &mut *guard;
    if st.generation != generation || st.phase != Phase::Evaluating {
      warn!(target: "session", generation, current = st.generation, phase = %st.phase, "Stale evaluation dropped");
      return Err(SessionError::Superseded);
    }
    let now = Instant::now();

    let evaluation = match result {
      Ok(evaluation) => evaluation,
      Err(e) => return Err(evaluation_failed(st, e, now)),
    };
    let newly_completed = match st.registry.apply_evaluation(&evaluation.scores) {
      Ok(newly) => newly,
      Err(e) => return Err(evaluation_failed(st, e, now)),
    };

    let pulsing = st.registry.full_ids();
    st.notices.pulse(pulsing.iter().cloned(), now);

    let won = st.registry.is_session_won();
    let signal = {
      let unearned = st.registry.unearned();
      st.attempts.record(newly_completed.len(), won, &unearned, &mut st.rng)
    };

    let mut hints_granted = 0;
    if won {
      st.phase = Phase::Won;
      st.final_feedback = None;
      info!(target: "session", session_id = %st.session_id, attempts = st.attempts.attempt_count(), "Session won");
    } else {
      st.final_feedback = evaluation.final_feedback.clone();

      // At most one completion hint per submission, paid by the first newly
      // completed badge that has not paid one yet.
      let payer = newly_completed
        .iter()
        .find(|id| st.registry.get(id.as_str()).is_some_and(|b| !b.granted_hint))
        .cloned();
      if let Some(id) = payer {
        let granted = {
          let unearned = st.registry.unearned();
          st.hints.request_hint(&unearned, &mut st.rng).is_some()
        };
        if granted {
          st.registry.mark_hint_granted(&id);
          hints_granted = 1;
        }
      }
      if hints_granted > 0 {
        st.notices.show(NoticeKind::HintUnlocked, HINT_UNLOCKED_MESSAGE, now);
      }

      match &signal {
        Some(Signal::Clue { clue, .. }) => st.notices.show(NoticeKind::ClueRevealed, format!("Try this: {}", clue), now),
        Some(Signal::KeepGoing) => st.notices.show(NoticeKind::KeepGoing, KEEP_GOING_MESSAGE, now),
        None => {}
      }
      st.phase = Phase::Ready;
    }
    st.last_error = None;
    st.notices.dismiss(NoticeKind::Alert);

    info!(
      target: "session",
      attempt = st.attempts.attempt_count(),
      newly = newly_completed.len(),
      streak = st.attempts.no_progress_streak(),
      hints_granted,
      won,
      "Submission scored"
    );

    Ok(SubmitOutcome {
      attempt_count: st.attempts.attempt_count(),
      newly_completed,
      pulsing,
      won,
      signal,
      hints_granted,
      final_feedback: st.final_feedback.clone(),
    })
  }

  /// Use hint `index`: fetch its text for the bound badge and append it to
  /// the draft. Unknown or used hints are ignored; on failure the hint stays
  /// unused so the player can retry it.
  #[instrument(level = "info", target = "session", skip(self))]
  pub async fn use_hint(&self, index: usize) -> Result<HintUse, SessionError> {
    let (generation, text, prompt, target) = {
      let mut guard = self.state.write().await;
      let st = &mut *guard;
      if st.phase != Phase::Ready {
        return Err(SessionError::WrongPhase { action: "use a hint", phase: st.phase });
      }
      let prompt = st.loaded_prompt("use a hint")?;
      let Some(target_id) = st.hints.begin_use(index) else {
        debug!(target: "session", index, "Hint unavailable; ignoring");
        return Ok(HintUse::Ignored);
      };
      let Some(target) = st.registry.get(&target_id).cloned() else {
        st.hints.abort_use(index);
        warn!(target: "session", index, %target_id, "Hint targets an unknown badge; ignoring");
        return Ok(HintUse::Ignored);
      };
      (st.generation, st.submission.clone(), prompt, target)
    };

    let result = self.api.generate_hint(&text, &prompt, std::slice::from_ref(&target)).await;

    let mut guard = self.state.write().await;
    let st = &mut *guard;
    if st.generation != generation {
      warn!(target: "session", generation, current = st.generation, "Stale hint dropped");
      return Err(SessionError::Superseded);
    }

    match result {
      Ok(hint) => {
        st.hints.complete_use(index, hint.clone());
        st.submission = append_hint_line(&st.submission, &hint);
        info!(target: "session", index, badge = %target.id, "Hint applied to draft");
        Ok(HintUse::Applied { index, text: hint })
      }
      Err(e) => {
        st.hints.abort_use(index);
        st.last_error = Some(e.to_string());
        st.notices.show(NoticeKind::Alert, HINT_FAILED_MESSAGE, Instant::now());
        error!(target: "session", index, error = %e, "Hint generation failed");
        Err(SessionError::Hint(e))
      }
    }
  }

  /// Close the celebration and go back to editing.
  pub async fn keep_editing(&self) -> Result<(), SessionError> {
    let mut st = self.state.write().await;
    if st.phase != Phase::Won {
      return Err(SessionError::WrongPhase { action: "keep editing", phase: st.phase });
    }
    st.phase = Phase::Ready;
    Ok(())
  }

  pub async fn dismiss_feedback(&self) {
    self.state.write().await.final_feedback = None;
  }

  /// Ask the remote renderer for a share card of the current draft.
  #[instrument(level = "info", target = "session", skip(self))]
  pub async fn share(&self) -> Result<ShareCard, SessionError> {
    let (generation, text, prompt, badges, attempts) = {
      let st = self.state.read().await;
      if !matches!(st.phase, Phase::Ready | Phase::Won) {
        return Err(SessionError::WrongPhase { action: "share", phase: st.phase });
      }
      let prompt = st.loaded_prompt("share")?;
      (st.generation, st.submission.clone(), prompt, st.registry.badges().to_vec(), st.attempts.attempt_count())
    };

    let result = self.api.generate_share_card(&text, &prompt, &badges, attempts).await;

    let mut st = self.state.write().await;
    if st.generation != generation {
      return Err(SessionError::Superseded);
    }
    match result {
      Ok(card) => {
        debug!(target: "session", has_url = card.url.is_some(), has_fallback = card.fallback_text.is_some(), "Share card ready");
        Ok(card)
      }
      Err(e) => {
        st.notices.show(NoticeKind::Alert, SHARE_FAILED_MESSAGE, Instant::now());
        warn!(target: "session", error = %e, "Share card failed");
        Err(SessionError::Share(e))
      }
    }
  }

  pub async fn view(&self) -> SessionView {
    self.view_at(Instant::now()).await
  }

  /// Snapshot for clients as of `now`; expired notices and pulses are pruned.
  pub async fn view_at(&self, now: Instant) -> SessionView {
    let mut st = self.state.write().await;
    st.notices.prune(now);
    SessionView::build(&st, now)
  }

  /// End the current session: release the init guard and start a new,
  /// uninitialized generation. Responses still in flight are dropped when
  /// they land.
  pub async fn teardown(&self) {
    self.release_init_guard();
    let mut guard = self.state.write().await;
    let st = &mut *guard;
    let generation = st.generation + 1;
    let rng = mem::replace(&mut st.rng, StdRng::seed_from_u64(0));
    let old = mem::replace(st, SessionState::fresh(generation, &self.cfg, rng, Instant::now()));
    info!(target: "session", old_session = %old.session_id, new_session = %st.session_id, generation, "Session torn down");
  }

  /// Play again: discard everything and initialize with fresh remote data.
  pub async fn reset(&self) -> Result<(), SessionError> {
    self.teardown().await;
    self.initialize().await
  }
}

async fn fetch_seed(api: Arc<dyn EvaluationApi>) -> InitResult {
  let prompt = api.fetch_prompt().await?;
  let badges = api.fetch_badges(&prompt.id).await?;
  Ok(SessionSeed { prompt, badges })
}

fn evaluation_failed(st: &mut SessionState, e: RemoteError, now: Instant) -> SessionError {
  st.phase = Phase::Ready;
  st.last_error = Some(e.to_string());
  st.notices.show(NoticeKind::Alert, EVALUATION_FAILED_MESSAGE, now);
  error!(target: "session", session_id = %st.session_id, error = %e, "Evaluation failed; badges unchanged");
  SessionError::Evaluation(e)
}
