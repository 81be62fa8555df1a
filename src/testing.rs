//! Scripted `EvaluationApi` for unit tests.
//!
//! Queue evaluations and hints before driving the session; each call pops one
//! entry. Call counters let tests assert how many requests actually went out.

use std::{
  collections::VecDeque,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
  },
  time::Duration,
};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::client::EvaluationApi;
use crate::domain::{Badge, BadgeScore, EarnedState, Evaluation, ShareCard, WritingPrompt};
use crate::error::{RemoteError, RemoteErrorKind};

#[derive(Default)]
pub struct Calls {
  pub prompt: AtomicUsize,
  pub badges: AtomicUsize,
  pub evaluate: AtomicUsize,
  pub hint: AtomicUsize,
  pub share: AtomicUsize,
}

impl Calls {
  pub fn get(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
  }
}

pub struct ScriptedApi {
  pub calls: Calls,
  badges: Vec<Badge>,
  init_error: Mutex<Option<RemoteError>>,
  init_delay: Duration,
  eval_gate: Option<Arc<Notify>>,
  hint_gate: Option<Arc<Notify>>,
  evaluations: Mutex<VecDeque<Result<Evaluation, RemoteError>>>,
  hints: Mutex<VecDeque<Result<String, RemoteError>>>,
  share: Mutex<VecDeque<Result<ShareCard, RemoteError>>>,
  /// Submission texts seen by `evaluate`, in order.
  pub evaluated_texts: Mutex<Vec<String>>,
}

pub fn sample_badges() -> Vec<Badge> {
  vec![
    Badge::new("badge_1", "Metaphor", "Uses an original metaphor.", "🌈", "Try showing things in a new light."),
    Badge::new("badge_2", "Tangerine", "Works in the idea of a tangerine.", "🍊", "Add a splash of color or sweetness."),
    Badge::new("badge_3", "Sound", "Makes the reader hear something.", "🔊", "Listen closely to your scene."),
  ]
}

pub fn sample_prompt() -> WritingPrompt {
  WritingPrompt { id: "poem".into(), prompt_text: "write a poem.".into(), description: Some("Use imagery.".into()) }
}

pub fn remote_failure(operation: &'static str) -> RemoteError {
  RemoteError::new(RemoteErrorKind::Status, operation, "HTTP 500 Internal Server Error: boom")
}

impl Default for ScriptedApi {
  fn default() -> Self {
    Self::new()
  }
}

impl ScriptedApi {
  pub fn new() -> Self {
    Self {
      calls: Calls::default(),
      badges: sample_badges(),
      init_error: Mutex::new(None),
      init_delay: Duration::ZERO,
      eval_gate: None,
      hint_gate: None,
      evaluations: Mutex::new(VecDeque::new()),
      hints: Mutex::new(VecDeque::new()),
      share: Mutex::new(VecDeque::new()),
      evaluated_texts: Mutex::new(Vec::new()),
    }
  }

  /// Make the first `fetch_prompt` fail; later ones succeed.
  pub fn failing_init(self) -> Self {
    *self.init_error.lock().unwrap() = Some(remote_failure("writing-type"));
    self
  }

  /// Slow down `fetch_prompt` so concurrent initializers overlap.
  pub fn with_init_delay(mut self, delay: Duration) -> Self {
    self.init_delay = delay;
    self
  }

  /// Block every `generate_hint` call until the gate is notified.
  pub fn with_hint_gate(mut self, gate: Arc<Notify>) -> Self {
    self.hint_gate = Some(gate);
    self
  }

  /// Block every `evaluate` call until the gate is notified.
  pub fn with_eval_gate(mut self, gate: Arc<Notify>) -> Self {
    self.eval_gate = Some(gate);
    self
  }

  /// Queue an evaluation with one score (0, 1 or 2) per sample badge.
  pub fn push_scores(&self, scores: [u8; 3]) {
    self.push_scores_with_feedback(scores, None);
  }

  pub fn push_scores_with_feedback(&self, scores: [u8; 3], feedback: Option<&str>) {
    let scores = self
      .badges
      .iter()
      .zip(scores)
      .map(|(b, s)| BadgeScore {
        badge_id: b.id.clone(),
        earned: EarnedState::from_score(u64::from(s)).unwrap_or_default(),
      })
      .collect();
    self.push_evaluation(Ok(Evaluation { scores, final_feedback: feedback.map(str::to_string) }));
  }

  pub fn push_evaluation(&self, evaluation: Result<Evaluation, RemoteError>) {
    self.evaluations.lock().unwrap().push_back(evaluation);
  }

  pub fn push_hint(&self, hint: Result<String, RemoteError>) {
    self.hints.lock().unwrap().push_back(hint);
  }

  pub fn push_share(&self, card: Result<ShareCard, RemoteError>) {
    self.share.lock().unwrap().push_back(card);
  }
}

fn exhausted(operation: &'static str) -> RemoteError {
  RemoteError::new(RemoteErrorKind::Transport, operation, "nothing scripted")
}

#[async_trait]
impl EvaluationApi for ScriptedApi {
  async fn fetch_prompt(&self) -> Result<WritingPrompt, RemoteError> {
    self.calls.prompt.fetch_add(1, Ordering::SeqCst);
    if !self.init_delay.is_zero() {
      tokio::time::sleep(self.init_delay).await;
    }
    let failure = self.init_error.lock().unwrap().take();
    match failure {
      Some(e) => Err(e),
      None => Ok(sample_prompt()),
    }
  }

  async fn fetch_badges(&self, _prompt_id: &str) -> Result<Vec<Badge>, RemoteError> {
    self.calls.badges.fetch_add(1, Ordering::SeqCst);
    Ok(self.badges.clone())
  }

  async fn evaluate(&self, text: &str, _prompt: &WritingPrompt, _badges: &[Badge]) -> Result<Evaluation, RemoteError> {
    self.calls.evaluate.fetch_add(1, Ordering::SeqCst);
    self.evaluated_texts.lock().unwrap().push(text.to_string());
    if let Some(gate) = &self.eval_gate {
      gate.notified().await;
    }
    let next = self.evaluations.lock().unwrap().pop_front();
    next.unwrap_or_else(|| Err(exhausted("evaluate")))
  }

  async fn generate_hint(&self, _text: &str, _prompt: &WritingPrompt, targets: &[Badge]) -> Result<String, RemoteError> {
    self.calls.hint.fetch_add(1, Ordering::SeqCst);
    assert_eq!(targets.len(), 1, "hints are scoped to exactly one badge");
    if let Some(gate) = &self.hint_gate {
      gate.notified().await;
    }
    let next = self.hints.lock().unwrap().pop_front();
    next.unwrap_or_else(|| Err(exhausted("get-hint")))
  }

  async fn generate_share_card(
    &self,
    _text: &str,
    _prompt: &WritingPrompt,
    _badges: &[Badge],
    _attempts: u32,
  ) -> Result<ShareCard, RemoteError> {
    self.calls.share.fetch_add(1, Ordering::SeqCst);
    let next = self.share.lock().unwrap().pop_front();
    next.unwrap_or_else(|| Err(exhausted("share-image")))
  }
}
