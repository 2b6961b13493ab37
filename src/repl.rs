use crate::agent::{ ChatAgent, ChatEvent };
use crate::history::format_message;

use log::{ debug, info, warn };
use std::error::Error;
use std::sync::Arc;
use tokio::io::{ AsyncBufReadExt, BufReader };
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    History,
    Context,
    Quit,
}

pub fn parse_command(line: &str) -> Command {
    match line.trim() {
        "/quit" | "/exit" => Command::Quit,
        "/history" => Command::History,
        "/context" => Command::Context,
        _ => Command::Send(line.to_string()),
    }
}

/// Turns state change events into terminal lines.
pub fn render(event: &ChatEvent) -> Vec<String> {
    match event {
        ChatEvent::MessageAppended(message) => vec![format_message(message)],
        ChatEvent::LoadingChanged(true) => vec!["...".to_string()],
        ChatEvent::LoadingChanged(false) => Vec::new(),
        ChatEvent::ErrorChanged(Some(error)) => vec![error.clone()],
        ChatEvent::ErrorChanged(None) => Vec::new(),
    }
}

pub async fn run_repl(agent: Arc<ChatAgent>) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut events = agent.subscribe();
    let renderer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    for line in render(&event) {
                        println!("{}", line);
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!("Display fell behind by {} event(s)", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("Type a message and press enter. /history, /context and /quit are available.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Quit => break,
            Command::History => {
                for message in agent.messages() {
                    println!("{}", format_message(&message));
                }
            }
            Command::Context => {
                for message in agent.context_window() {
                    println!("{}", format_message(&message));
                }
            }
            Command::Send(text) => {
                if let Err(e) = agent.send_message(&text).await {
                    debug!("Turn failed: {}", e);
                }
            }
        }
    }

    info!("Ending chat session {}", agent.session_id());
    renderer.abort();
    Ok(())
}
