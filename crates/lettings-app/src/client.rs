//! Interactive terminal client for the chat server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use lettings_core::config::ClientConfig;
use lettings_core::error::{LettingsError, Result};
use lettings_core::types::{ChatMessage, ChatResponse, ResponseKind};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const PROMPT: &str = "You: ";
const MAX_BACKOFF_MS: u64 = 30_000;

/// What the user typed.
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Exit,
    Blank,
    Message(&'a str),
}

pub fn parse_input(line: &str) -> Input<'_> {
    let text = line.trim();
    match text {
        "" => Input::Blank,
        "exit" | "quit" | "q" => Input::Exit,
        _ => Input::Message(text),
    }
}

/// Line printed for a server reply.
pub fn render(response: &ChatResponse) -> String {
    match response.kind {
        ResponseKind::Error => format!("Error: {}", response.message),
        ResponseKind::Ai => format!("AI: {}", response.message),
    }
}

/// Run the chat loop until the user exits or stdin closes.
pub async fn run(url: &str, config: &ClientConfig) -> Result<()> {
    let mut socket = connect_with_retry(url, config).await?;
    println!("Connected to {}. Type 'exit' to quit.", url);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(PROMPT.as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let text = match parse_input(&line) {
            Input::Exit => break,
            Input::Blank => continue,
            Input::Message(text) => text,
        };

        let frame = serde_json::to_string(&ChatMessage::new(text))
            .map_err(|e| LettingsError::Serialization(e.to_string()))?;

        match exchange(&mut socket, frame).await {
            Ok(response) => println!("{}", render(&response)),
            Err(e) => {
                warn!(error = %e, "Connection lost");
                println!("Error: connection lost, reconnecting...");
                socket = connect_with_retry(url, config).await?;
                println!("Reconnected. Please resend your last message.");
            }
        }
    }

    if let Err(e) = socket.close(None).await {
        debug!(error = %e, "Close handshake failed");
    }
    println!("Goodbye!");
    Ok(())
}

async fn exchange(socket: &mut Socket, frame: String) -> Result<ChatResponse> {
    socket
        .send(Message::Text(frame.into()))
        .await
        .map_err(|e| LettingsError::Api(format!("Send failed: {}", e)))?;

    while let Some(message) = socket.next().await {
        match message {
            Ok(Message::Text(text)) => {
                return serde_json::from_str(text.as_str())
                    .map_err(|e| LettingsError::Protocol(format!("Bad reply: {}", e)));
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => return Err(LettingsError::Api(format!("Receive failed: {}", e))),
        }
    }
    Err(LettingsError::Api("Server closed the connection".to_string()))
}

/// Connect, retrying up to `reconnect_attempts` times with doubling delay.
async fn connect_with_retry(url: &str, config: &ClientConfig) -> Result<Socket> {
    let mut backoff = config.reconnect_delay_ms;
    let mut attempt = 0;
    loop {
        match tokio_tungstenite::connect_async(url).await {
            Ok((socket, _)) => {
                info!(url, "Connected to chat server");
                return Ok(socket);
            }
            Err(e) if attempt < config.reconnect_attempts => {
                attempt += 1;
                warn!(url, attempt, error = %e, "Connect failed, retrying");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
                backoff = backoff.saturating_mul(2).min(MAX_BACKOFF_MS);
            }
            Err(e) => {
                return Err(LettingsError::Api(format!(
                    "Could not connect to {} after {} retries: {}",
                    url, attempt, e
                )));
            }
        }
    }
}
