//! Mentra - conversational check-in in the terminal
//!
//! Chats through a rate-limit tolerant Gemini gateway, analyzes the
//! conversation and walks through a mocked booking flow.

mod booking;
mod config;
mod gateway;
mod llm;
mod runtime;
mod state_machine;
mod system_prompt;
mod terminal;
mod transcript;

use config::AppConfig;
use gateway::Gateway;
use runtime::spawn_session;
use state_machine::SessionContext;
use std::sync::Arc;
use terminal::{parse_command, render_update, Command, HELP};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they stay out of the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mentra=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        chat_model = %config.gateway.chat_model,
        analysis_model = %config.gateway.analysis_model,
        variant = %config.gateway.analysis_variant,
        threshold = config.analysis_threshold,
        "Configuration loaded"
    );

    let gateway = Gateway::from_config(&config.gateway)?;
    if gateway.credentials().is_empty() {
        tracing::warn!("No API keys configured. Set MENTRA_API_KEYS or GEMINI_API_KEY.");
    } else {
        tracing::info!(keys = gateway.credentials().len(), "Gateway initialized");
    }

    let session_id = uuid::Uuid::new_v4().to_string();
    let context = SessionContext::new(session_id, config.analysis_threshold);
    let handle = spawn_session(context, Arc::new(gateway));

    let mut updates = handle.subscribe();
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => {
                    if let Some(text) = render_update(&update) {
                        println!("{text}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Display fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("{}", terminal::render_state(&state_machine::ViewState::Landing).unwrap_or_default());
    println!("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Some(Command::Event(event))) => handle.send(event).await?,
            Ok(Some(Command::Help)) => println!("{HELP}"),
            Ok(Some(Command::Quit)) => break,
            Ok(None) => {}
            Err(e) => println!("! {e}"),
        }
    }

    Ok(())
}
