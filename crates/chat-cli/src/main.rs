//! chat-cli: terminal harness for the chat synchronization engine
//!
//! Connects one user to the backend, subscribes to session updates
//! and sends stdin lines as messages.
//!
//! Usage:
//!   chat-cli <user-id> [username]   - Connect and chat
//!   chat-cli --help                 - Show help

use std::sync::Arc;

use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

use chat_engine::{ConnectionState, SessionController, SessionUpdate};
use chat_ws::{WsConfig, WsTransport};

/// Run mode
enum RunMode {
    /// Interactive chat for a user
    Chat { user_id: String, username: String },
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args();

    let (user_id, username) = match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("chat-cli {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Chat { user_id, username } => (user_id, username),
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = WsConfig::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;
    println!("Connecting to {} as {}...", config.url, username);

    let controller = SessionController::new(Arc::new(WsTransport::new(config)));
    controller.subscribe(print_update);
    controller.start(&user_id);

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => {}
            "/quit" | "/exit" => break,
            "/read" => controller.mark_all_as_read(),
            "/help" => print_commands(),
            _ => {
                if let Err(e) = controller.send_message(line, &username) {
                    eprintln!("error: {}", e);
                }
            }
        }
    }

    controller.stop();
    Ok(())
}

/// Print one session update: connection transitions and the latest message
fn print_update(update: SessionUpdate) {
    match update.connection_state {
        ConnectionState::Connecting => println!("[connecting]"),
        ConnectionState::Connected if update.snapshot.count == 0 => println!("[connected]"),
        ConnectionState::Disconnected => {
            match update.error {
                Some(error) => println!("[disconnected: {}]", error),
                None => println!("[disconnected]"),
            }
            return;
        }
        ConnectionState::Connected => {}
    }

    if let Some(message) = update.snapshot.messages.last() {
        let who = message.username.as_deref().unwrap_or("?");
        let marker = if message.is_sent { ">" } else { "<" };
        println!(
            "{} {}: {}  ({} unread)",
            marker, who, message.text, update.snapshot.unread_count
        );
    }
}

/// Parse command line arguments
fn parse_args() -> RunMode {
    let args: Vec<String> = std::env::args().collect();

    let mut positional = Vec::new();
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => positional.push(arg.clone()),
        }
    }

    match positional.len() {
        0 => RunMode::Help,
        _ => {
            let user_id = positional[0].clone();
            let username = positional.get(1).cloned().unwrap_or_else(|| user_id.clone());
            RunMode::Chat { user_id, username }
        }
    }
}

/// Print help message
fn print_help() {
    println!("chat-cli - chat session synchronization demo");
    println!();
    println!("Usage:");
    println!("  chat-cli <user-id> [username]   Connect and chat");
    println!("  chat-cli --help                 Show this help message");
    println!("  chat-cli --version              Show version");
    println!();
    println!("Environment Variables:");
    println!("  CHAT_WS_URL       Backend endpoint (default: ws://localhost:8080/chat)");
    println!("  CHAT_WS_CONFIG    Path to a TOML config file");
}

/// Print in-session commands
fn print_commands() {
    println!("Commands:");
    println!("  /read   Mark all messages as read");
    println!("  /quit   Disconnect and exit");
    println!("  /help   Show this message");
}
