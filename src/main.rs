//! CLI for topicrelay
//!
//! Subcommands:
//! - `server`: run the WebSocket relay
//! - `client`: run the interactive chat client

use std::sync::Arc;

use clap::Parser;
use topicrelay::client::chat_client::{prompt, run_client};
use topicrelay::config::load_config;
use topicrelay::relay::Relay;
use topicrelay::transport::start_websocket_server;
use topicrelay::utils::{RelayError, logging};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "topicrelay")]
enum Command {
    /// Start the WebSocket relay server
    Server,
    /// Join a topic and chat from the terminal
    Client {
        /// WebSocket URL of the relay
        #[arg(long, default_value = "ws://127.0.0.1:8000/ws")]
        url: String,
        /// Display name to request (prompted for when omitted)
        #[arg(long)]
        username: Option<String>,
        /// Topic to join (prompted for when omitted)
        #[arg(long)]
        topic: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cmd = Command::parse();

    match cmd {
        Command::Server => {
            if let Err(e) = run_server().await {
                // config may have failed before the subscriber was installed
                logging::init("info");
                error!("Server failed: {}", e);
            }
        }
        Command::Client {
            url,
            username,
            topic,
        } => {
            logging::init("warn");
            if let Err(e) = chat(&url, username, topic).await {
                eprintln!("Client failed: {e}");
            }
        }
    }
}

async fn run_server() -> Result<(), RelayError> {
    let config = load_config()?;
    logging::init(&config.log.level);

    let relay = Arc::new(Relay::new(config.relay.message_ttl()));
    info!(
        ttl_secs = config.relay.message_ttl_secs,
        "Server started - waiting for connections"
    );

    let addr = config.server.addr();
    tokio::select! {
        res = start_websocket_server(&addr, relay) => {
            res?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn chat(url: &str, username: Option<String>, topic: Option<String>) -> Result<(), RelayError> {
    let username = match username {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => prompt("Enter your username: ").await?,
    };
    let topic = match topic {
        Some(topic) if !topic.trim().is_empty() => topic.trim().to_string(),
        _ => prompt("Enter topic to join: ").await?,
    };
    run_client(url, &username, &topic).await
}
