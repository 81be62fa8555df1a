//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to the session orchestrator. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::error::SessionError;
use crate::protocol::{ClientWsMessage, HintUseOut, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "mystery_badges", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "mystery_badges", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "mystery_badges", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "mystery_badges", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "mystery_badges", "WebSocket disconnected");
}

async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  dispatch(msg, state).await.unwrap_or_else(|e| ServerWsMessage::Error { message: e.to_string() })
}

async fn dispatch(msg: ClientWsMessage, state: &AppState) -> Result<ServerWsMessage, SessionError> {
  let session = &state.session;
  let reply = match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::GetSession => ServerWsMessage::Session { session: session.view().await },

    ClientWsMessage::Edit { text } => {
      session.edit(text).await?;
      ServerWsMessage::Session { session: session.view().await }
    }

    ClientWsMessage::Activity => {
      session.record_activity().await;
      ServerWsMessage::Session { session: session.view().await }
    }

    ClientWsMessage::Submit => {
      let outcome = session.submit().await?;
      info!(target: "session", attempt = outcome.attempt_count, won = outcome.won, "WS submission scored");
      ServerWsMessage::Submitted { outcome, session: session.view().await }
    }

    ClientWsMessage::UseHint { index } => {
      let used = session.use_hint(index).await?;
      ServerWsMessage::HintUsed { result: HintUseOut::new(used, session.view().await) }
    }

    ClientWsMessage::KeepEditing => {
      session.keep_editing().await?;
      ServerWsMessage::Session { session: session.view().await }
    }

    ClientWsMessage::DismissFeedback => {
      session.dismiss_feedback().await;
      ServerWsMessage::Session { session: session.view().await }
    }

    ClientWsMessage::Share => ServerWsMessage::ShareCard { card: session.share().await? },

    ClientWsMessage::Reset => {
      session.reset().await?;
      ServerWsMessage::Session { session: session.view().await }
    }
  };
  Ok(reply)
}
