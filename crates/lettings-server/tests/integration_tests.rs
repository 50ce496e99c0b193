//! Integration tests for the chat server.
//!
//! HTTP routes are driven with `oneshot`; the WebSocket endpoint runs on a
//! real listener with a stub completion client over an in-memory store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;

use lettings_assistant::{Assistant, AssistantError, CompletionClient, Role, Turn};
use lettings_core::config::{LettingsConfig, StoreConfig};
use lettings_core::types::{ChatMessage, ChatResponse, ResponseKind};
use lettings_server::handlers::HealthResponse;
use lettings_server::ws::{EMPTY_REPLY, MALFORMED_REPLY};
use lettings_server::{create_router, start_server, AppState};
use lettings_store::DocumentExecutor;

// =============================================================================
// Helpers
// =============================================================================

type Socket = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Replies with a fixed prefix and the user text; keeps every prompt.
#[derive(Default)]
struct StubCompletion {
    prompts: Mutex<Vec<Vec<Turn>>>,
}

impl StubCompletion {
    fn system_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter_map(|p| p.iter().find(|t| t.role == Role::System))
            .map(|t| t.content.clone())
            .collect()
    }
}

#[async_trait]
impl CompletionClient for StubCompletion {
    async fn complete(&self, messages: &[Turn]) -> Result<String, AssistantError> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        let last = messages.last().map(|t| t.content.clone()).unwrap_or_default();
        Ok(format!("stub reply to: {}", last))
    }
}

fn make_state(completion: Arc<StubCompletion>) -> AppState {
    let mut config = LettingsConfig::default();
    config.store = StoreConfig {
        uri: ":memory:".to_string(),
        seed_sample_data: true,
        ..StoreConfig::default()
    };
    let executor = Arc::new(DocumentExecutor::new(config.store.clone()));
    let assistant = Arc::new(Assistant::new(
        executor,
        completion,
        config.assistant.clone(),
    ));
    AppState::new(config, assistant)
}

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

/// Serve the router on an ephemeral port and return the ws URL.
async fn spawn_server(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });
    format!("ws://{}/ws", addr)
}

async fn exchange(socket: &mut Socket, frame: String) -> ChatResponse {
    socket.send(Message::Text(frame.into())).await.unwrap();
    let reply = tokio::time::timeout(Duration::from_secs(10), socket.next())
        .await
        .expect("timed out waiting for reply")
        .expect("connection closed")
        .unwrap();
    match reply {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("unexpected frame {:?}", other),
    }
}

fn chat_frame(text: &str) -> String {
    serde_json::to_string(&ChatMessage::new(text)).unwrap()
}

// =============================================================================
// HTTP
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router(make_state(Arc::default()));
    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_bytes(resp).await;
    let raw: Value = serde_json::from_slice(&body).unwrap();
    assert!(raw.get("uptimeSecs").is_some());

    let health: HealthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.environment, "development");
    assert_eq!(health.assistant, "uninitialized");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = create_router(make_state(Arc::default()));
    let resp = app
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_ws_rejected_after_cleanup() {
    let state = make_state(Arc::default());
    state.assistant.cleanup().await;
    let url = spawn_server(state).await;

    let result = tokio_tungstenite::connect_async(url.as_str()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_start_server_stops_on_shutdown_signal() {
    let state = make_state(Arc::default());
    let assistant = state.assistant.clone();
    let mut config = LettingsConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        start_server(&config, state, async {}),
    )
    .await
    .expect("server did not shut down");

    assert!(result.is_ok());
    assert_eq!(
        assistant.state().await,
        lettings_assistant::LifecycleState::Closed
    );
}

// =============================================================================
// WebSocket chat
// =============================================================================

#[tokio::test]
async fn test_chat_round_trip_with_property_lookup() {
    let completion = Arc::new(StubCompletion::default());
    let url = spawn_server(make_state(Arc::clone(&completion))).await;
    let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();

    let reply = exchange(&mut socket, chat_frame("Show me 2 bedroom flats in Edinburgh")).await;
    assert_eq!(reply.kind, ResponseKind::Ai);
    assert_eq!(
        reply.message,
        "stub reply to: Show me 2 bedroom flats in Edinburgh"
    );

    let prompts = completion.system_prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("PROP-003"));
    assert!(!prompts[0].contains("PROP-001"));
}

#[tokio::test]
async fn test_general_chat_skips_lookup() {
    let completion = Arc::new(StubCompletion::default());
    let url = spawn_server(make_state(Arc::clone(&completion))).await;
    let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();

    let reply = exchange(&mut socket, chat_frame("Hello there")).await;
    assert_eq!(reply.kind, ResponseKind::Ai);

    let prompts = completion.system_prompts();
    assert!(!prompts[0].contains("PROP-"));
}

#[tokio::test]
async fn test_malformed_frame_gets_error_and_connection_survives() {
    let url = spawn_server(make_state(Arc::default())).await;
    let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();

    let reply = exchange(&mut socket, "not json at all".to_string()).await;
    assert_eq!(reply.kind, ResponseKind::Error);
    assert_eq!(reply.message, MALFORMED_REPLY);

    let reply = exchange(&mut socket, r#"{"timestamp":"2024-01-01T00:00:00Z"}"#.to_string()).await;
    assert_eq!(reply.kind, ResponseKind::Error);

    let reply = exchange(&mut socket, chat_frame("hi")).await;
    assert_eq!(reply.kind, ResponseKind::Ai);
}

#[tokio::test]
async fn test_blank_message_gets_error_frame() {
    let url = spawn_server(make_state(Arc::default())).await;
    let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();

    let reply = exchange(&mut socket, chat_frame("   ")).await;
    assert_eq!(reply.kind, ResponseKind::Error);
    assert_eq!(reply.message, EMPTY_REPLY);
}

#[tokio::test]
async fn test_replies_arrive_in_order() {
    let url = spawn_server(make_state(Arc::default())).await;
    let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();

    for i in 0..3 {
        socket
            .send(Message::Text(chat_frame(&format!("message {}", i)).into()))
            .await
            .unwrap();
    }
    for i in 0..3 {
        let frame = tokio::time::timeout(Duration::from_secs(10), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let reply: ChatResponse = serde_json::from_str(frame.to_text().unwrap()).unwrap();
        assert_eq!(reply.message, format!("stub reply to: message {}", i));
    }
}

#[tokio::test]
async fn test_sessions_are_isolated_per_connection() {
    let completion = Arc::new(StubCompletion::default());
    let url = spawn_server(make_state(Arc::clone(&completion))).await;

    let (mut first, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    exchange(&mut first, chat_frame("my name is Alice")).await;

    exchange(&mut first, chat_frame("what is my name")).await;

    let (mut second, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    let reply = exchange(&mut second, chat_frame("hello")).await;
    assert_eq!(reply.kind, ResponseKind::Ai);

    let prompts = completion.prompts.lock().unwrap();
    // second turn on the first connection: system + 2 prior turns + user
    assert_eq!(prompts[1].len(), 4);
    assert_eq!(prompts[1][1].content, "my name is Alice");
    // the second connection starts with no history
    assert_eq!(prompts[2].len(), 2);
    assert!(prompts[2].iter().all(|t| t.content != "my name is Alice"));
    drop(prompts);

    first.close(None).await.unwrap();
}
