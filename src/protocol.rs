//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! The session view hides what the player has not earned yet: criteria until
//! a badge is discovered, hint text until the hint is used.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{EarnedState, ShareCard, WritingPrompt};
use crate::notify::{Notice, NoticeKind, TRY_ASSIST_MESSAGE};
use crate::session::{HintUse, Phase, SessionState, SubmitOutcome};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    GetSession,
    Edit {
        text: String,
    },
    Activity,
    Submit,
    UseHint {
        index: usize,
    },
    KeepEditing,
    DismissFeedback,
    Share,
    Reset,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session {
        session: SessionView,
    },
    Submitted {
        outcome: SubmitOutcome,
        session: SessionView,
    },
    HintUsed {
        #[serde(flatten)]
        result: HintUseOut,
    },
    ShareCard {
        card: ShareCard,
    },
    Error {
        message: String,
    },
}

/// Badge as the player sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BadgeView {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub earned: EarnedState,
    /// 0, 1 or 2; the wire form the evaluation service uses.
    pub score: u8,
    /// Present once the badge has been discovered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criteria: Option<String>,
    pub pulsing: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HintView {
    pub index: usize,
    pub is_used: bool,
    pub target_badge_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Everything a client needs to render the session.
#[derive(Clone, Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub phase: Phase,
    pub prompt: Option<WritingPrompt>,
    pub submission: String,
    pub badges: Vec<BadgeView>,
    pub hints: Vec<HintView>,
    pub max_hints: usize,
    pub hint_in_flight: Option<usize>,
    pub attempt_count: u32,
    pub no_progress_streak: u32,
    pub final_feedback: Option<String>,
    pub notices: Vec<Notice>,
    pub last_error: Option<String>,
}

impl SessionView {
    pub fn build(st: &SessionState, now: Instant) -> Self {
        let badges = st
            .registry
            .badges()
            .iter()
            .map(|b| BadgeView {
                id: b.id.clone(),
                name: b.name.clone(),
                icon: b.icon.clone(),
                earned: b.earned,
                score: b.earned.score(),
                criteria: st.registry.is_discovered(&b.id).then(|| b.criteria.clone()),
                pulsing: st.notices.is_pulsing(&b.id, now),
            })
            .collect();

        let hints = st
            .hints
            .hints()
            .iter()
            .enumerate()
            .map(|(index, h)| HintView {
                index,
                is_used: h.is_used,
                target_badge_id: h.target_badge_id.clone(),
                text: h.is_used.then(|| h.text.clone()),
            })
            .collect();

        let mut notices = st.notices.visible(now);
        let assist_due = st.phase == Phase::Ready
            && st.notices.assist_prompt_due(now, st.submission.is_empty(), st.hints.first_hint_unused());
        if assist_due {
            notices.push(Notice { kind: NoticeKind::TryAssist, message: TRY_ASSIST_MESSAGE.to_string() });
        }

        Self {
            session_id: st.session_id,
            phase: st.phase,
            prompt: st.prompt.clone(),
            submission: st.submission.clone(),
            badges,
            hints,
            max_hints: st.hints.max_hints(),
            hint_in_flight: st.hints.in_flight(),
            attempt_count: st.attempts.attempt_count(),
            no_progress_streak: st.attempts.no_progress_streak(),
            final_feedback: st.final_feedback.clone(),
            notices,
            last_error: st.last_error.clone(),
        }
    }
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct DraftIn {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitOut {
    pub outcome: SubmitOutcome,
    pub session: SessionView,
}

#[derive(Debug, Serialize)]
pub struct HintUseOut {
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub session: SessionView,
}

impl HintUseOut {
    pub fn new(used: HintUse, session: SessionView) -> Self {
        match used {
            HintUse::Applied { text, .. } => Self { applied: true, text: Some(text), session },
            HintUse::Ignored => Self { applied: false, text: None, session },
        }
    }
}
