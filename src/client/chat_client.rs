//! Reference command-line chat client.
//!
//! Connects to a relay, joins one topic, then runs two loops at once:
//! incoming frames are rendered to stdout, and stdin lines are sent as chat
//! messages. `/list` is forwarded verbatim and `/quit` closes the connection.

use std::io::Write;

use chrono::{DateTime, Local};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::transport::message::{LIST_COMMAND, ServerMessage};
use crate::utils::RelayError;

const QUIT_COMMAND: &str = "/quit";

/// What to do with one line typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Skip,
    Quit,
    /// Frame to send as-is.
    Send(String),
}

/// Classify a stdin line. Chat text is stamped with `timestamp`.
pub fn parse_input(line: &str, timestamp: i64) -> Input {
    match line.trim() {
        "" => Input::Skip,
        QUIT_COMMAND => Input::Quit,
        LIST_COMMAND => Input::Send(LIST_COMMAND.to_string()),
        _ => Input::Send(json!({ "message": line, "timestamp": timestamp }).to_string()),
    }
}

/// Turn a frame from the server into the line shown to the user.
pub fn render_frame(frame: &str) -> String {
    match serde_json::from_str::<ServerMessage>(frame) {
        Ok(ServerMessage::Error { error }) => format!("Error: {error}"),
        Ok(ServerMessage::System { system }) => format!("System: {system}"),
        Ok(ServerMessage::Delivered { .. }) => "Sent!".to_string(),
        Ok(ServerMessage::Chat {
            username,
            message,
            timestamp,
        }) => {
            let time = DateTime::from_timestamp(timestamp, 0)
                .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
                .unwrap_or_else(|| "--:--".to_string());
            format!("{time} {username}: {message}")
        }
        // Plain text, e.g. the topic list.
        Err(_) => frame.to_string(),
    }
}

pub async fn run_client(url: &str, username: &str, topic: &str) -> Result<(), RelayError> {
    let (ws_stream, _response) = connect_async(url).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let join = json!({ "username": username, "topic": topic });
    ws_sender
        .send(WsMessage::Text(join.to_string().into()))
        .await?;

    println!("Connected as '{username}' to topic '{topic}'");
    println!("Commands: {LIST_COMMAND} (show topics), {QUIT_COMMAND} (exit)");

    let reader = tokio::spawn(async move {
        while let Some(frame) = ws_receiver.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => println!("{}", render_frame(text.as_str())),
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Connection error: {e}");
                    break;
                }
            }
        }
        println!("Disconnected from server");
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You: ");
        let _ = std::io::stdout().flush();

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match parse_input(&line, chrono::Utc::now().timestamp()) {
            Input::Skip => continue,
            Input::Quit => break,
            Input::Send(frame) => {
                if reader.is_finished() {
                    break;
                }
                ws_sender.send(WsMessage::Text(frame.into())).await?;
            }
        }
    }

    println!("Goodbye!");
    let _ = ws_sender.close().await;
    reader.abort();
    Ok(())
}

/// Read a non-empty trimmed line from stdin after printing `prompt`.
pub async fn prompt(prompt: &str) -> Result<String, RelayError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{prompt}");
        let _ = std::io::stdout().flush();
        match lines.next_line().await? {
            Some(line) if !line.trim().is_empty() => return Ok(line.trim().to_string()),
            Some(_) => println!("A value is required."),
            None => {
                return Err(RelayError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "stdin closed",
                )));
            }
        }
    }
}
