//! Error types for remote calls and session operations.

use std::fmt;

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use thiserror::Error;

use crate::session::Phase;

/// Broad class of a failed remote call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
  /// Connection, timeout or other transport failure.
  Transport,
  /// The service answered with a non-success status.
  Status,
  /// The body did not match the expected contract.
  Decode,
}

impl fmt::Display for RemoteErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Self::Transport => "transport",
      Self::Status => "status",
      Self::Decode => "decode",
    };
    f.write_str(s)
  }
}

/// Failure of one call to the evaluation service. Cloneable so every waiter on
/// a shared initialization sees the same error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{operation} failed ({kind}): {cause}")]
pub struct RemoteError {
  pub kind: RemoteErrorKind,
  pub operation: &'static str,
  pub cause: String,
}

impl RemoteError {
  pub fn new(kind: RemoteErrorKind, operation: &'static str, cause: impl Into<String>) -> Self {
    Self { kind, operation, cause: cause.into() }
  }

  pub fn transport(operation: &'static str, cause: impl fmt::Display) -> Self {
    Self::new(RemoteErrorKind::Transport, operation, cause.to_string())
  }

  pub fn decode(operation: &'static str, cause: impl fmt::Display) -> Self {
    Self::new(RemoteErrorKind::Decode, operation, cause.to_string())
  }
}

/// Errors surfaced by the session orchestrator.
#[derive(Debug, Error)]
pub enum SessionError {
  #[error("session could not be initialized: {0}")]
  Initialization(RemoteError),

  #[error("submission could not be evaluated: {0}")]
  Evaluation(RemoteError),

  #[error("hint could not be generated: {0}")]
  Hint(RemoteError),

  #[error("share card could not be generated: {0}")]
  Share(RemoteError),

  #[error("write something before submitting")]
  EmptySubmission,

  #[error("cannot {action} while session is {phase}")]
  WrongPhase { action: &'static str, phase: Phase },

  /// The response belongs to a session that was reset while the call was out.
  #[error("response arrived for a superseded session")]
  Superseded,
}

impl SessionError {
  pub fn status_code(&self) -> StatusCode {
    match self {
      Self::Initialization(_) | Self::Evaluation(_) | Self::Hint(_) | Self::Share(_) => StatusCode::BAD_GATEWAY,
      Self::EmptySubmission => StatusCode::UNPROCESSABLE_ENTITY,
      Self::WrongPhase { .. } | Self::Superseded => StatusCode::CONFLICT,
    }
  }
}

#[derive(Serialize)]
struct ErrorBody {
  error: String,
}

impl IntoResponse for SessionError {
  fn into_response(self) -> Response {
    (self.status_code(), Json(ErrorBody { error: self.to_string() })).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn remote_error_display() {
    let e = RemoteError::transport("evaluate", "connection refused");
    assert_eq!(e.to_string(), "evaluate failed (transport): connection refused");
  }

  #[test]
  fn session_error_status_codes() {
    assert_eq!(SessionError::EmptySubmission.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(SessionError::Superseded.status_code(), StatusCode::CONFLICT);
    assert_eq!(
      SessionError::WrongPhase { action: "submit", phase: Phase::Evaluating }.status_code(),
      StatusCode::CONFLICT
    );
    let remote = RemoteError::decode("get-hint", "missing field `hint`");
    assert_eq!(SessionError::Hint(remote).status_code(), StatusCode::BAD_GATEWAY);
  }

  #[test]
  fn wrong_phase_message_names_the_phase() {
    let e = SessionError::WrongPhase { action: "submit", phase: Phase::Won };
    assert_eq!(e.to_string(), "cannot submit while session is won");
  }
}
