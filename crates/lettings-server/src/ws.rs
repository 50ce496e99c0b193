//! WebSocket chat endpoint.
//!
//! Each connection owns one assistant [`Session`]. Frames on a connection
//! are handled strictly in order: the next frame is not read until the
//! reply to the current one has been sent.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use lettings_assistant::{AssistantError, LifecycleState, Session};
use lettings_core::types::{ChatMessage, ChatResponse};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Reply to a frame that is not a valid chat message.
pub const MALFORMED_REPLY: &str = "Invalid message format.";
/// Reply to a frame whose message is blank.
pub const EMPTY_REPLY: &str = "Please enter a message.";
/// Reply when processing fails unexpectedly.
pub const PROCESSING_ERROR_REPLY: &str =
    "Sorry, I encountered an error processing your message. Please try again.";

static CONNECTION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// GET /ws - upgrade to a chat connection.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> ApiResult<Response> {
    if state.assistant.state().await == LifecycleState::Closed {
        return Err(ApiError::ServiceUnavailable(
            "The assistant is shutting down".to_string(),
        ));
    }
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state)))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = CONNECTION_COUNTER.fetch_add(1, Ordering::Relaxed);
    info!(connection_id, "Client connected");

    let (mut sender, mut receiver) = socket.split();
    let mut session = state.assistant.new_session();

    while let Some(frame) = receiver.next().await {
        let reply = match frame {
            Ok(Message::Text(text)) => handle_text(&state, &mut session, text.as_str()).await,
            Ok(Message::Binary(_)) => ChatResponse::error(MALFORMED_REPLY),
            Ok(Message::Close(_)) => break,
            // axum answers pings itself.
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Err(e) => {
                debug!(connection_id, error = %e, "Connection dropped");
                break;
            }
        };

        if let Err(e) = send_response(&mut sender, &reply).await {
            debug!(connection_id, error = %e, "Reply not delivered");
            break;
        }
    }

    info!(
        connection_id,
        messages = session.message_count(),
        "Client disconnected"
    );
}

async fn handle_text(state: &AppState, session: &mut Session, text: &str) -> ChatResponse {
    let inbound: ChatMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "Malformed chat frame");
            return ChatResponse::error(MALFORMED_REPLY);
        }
    };
    debug!(user_id = ?inbound.user_id, "Chat message received");

    match state.assistant.process_message(session, &inbound.message).await {
        Ok(reply) => ChatResponse::ai(reply),
        Err(AssistantError::EmptyMessage) => ChatResponse::error(EMPTY_REPLY),
        Err(e) => {
            error!(error = %e, "Failed to process chat message");
            ChatResponse::error(PROCESSING_ERROR_REPLY)
        }
    }
}

async fn send_response(
    sender: &mut SplitSink<WebSocket, Message>,
    response: &ChatResponse,
) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(response) {
        Ok(json) => json,
        Err(e) => {
            error!(error = %e, "Failed to serialize chat response");
            return Ok(());
        }
    };
    sender.send(Message::Text(json.into())).await
}
