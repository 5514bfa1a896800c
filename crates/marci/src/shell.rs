// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The interactive Marci shell.
//!
//! A readline REPL over the chat engine: streams reply deltas to stdout as
//! they are folded, surfaces mood and theme suggestions, and exposes the
//! session lifecycle through slash commands.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::warn;

use marci_config::model::MarciConfig;
use marci_core::{ChatSession, KeyValueAdapter, MarciError, ProviderAdapter, Sender};
use marci_engine::{
    ChatEngine, EngineConfig, EngineEvent, Persona, ThemeAdvisor, ThemeSuggestion,
};
use marci_gemini::{GeminiClient, GeminiProvider};
use marci_storage::{SessionStore, SqliteKv};

use crate::speech::ConsoleSpeech;

/// Runs the interactive REPL until the user quits.
pub async fn run_shell(config: MarciConfig) -> Result<(), MarciError> {
    let kv = SqliteKv::new(config.storage.clone());
    kv.initialize().await?;
    let store = SessionStore::new(Arc::new(kv));

    let Some(api_key) = config.gemini.api_key.clone() else {
        eprintln!(
            "error: Gemini API key required. Set gemini.api_key in marci.toml or the MARCI_GEMINI_API_KEY environment variable."
        );
        return Err(MarciError::Config("gemini.api_key is not set".to_string()));
    };
    let mut client = GeminiClient::new(api_key, config.gemini.model.clone())?;
    if let Some(base) = config.gemini.api_base.clone() {
        client = client.with_base_url(base);
    }
    let provider: Arc<dyn ProviderAdapter> = Arc::new(GeminiProvider::with_client(client));

    let engine_config = EngineConfig {
        summary_threshold: config.chat.summary_threshold,
        peer_delay_min_ms: config.chat.peer_delay_min_ms,
        peer_delay_max_ms: config.chat.peer_delay_max_ms,
        speech_enabled: config.speech.enabled,
        local_user: config.chat.local_user.clone(),
        system_instruction: marci_config::resolve_system_instruction(&config)?,
    };
    let engine = ChatEngine::new(
        store,
        provider.clone(),
        Some(Arc::new(ConsoleSpeech::new())),
        engine_config,
    )
    .await?;

    let advisor = ThemeAdvisor::new(
        provider,
        config.chat.themes.clone(),
        Duration::from_secs(config.chat.theme_cooldown_secs),
    );
    let mut current_theme = config
        .chat
        .themes
        .first()
        .cloned()
        .unwrap_or_else(|| "Default".to_string());

    let mut rl = DefaultEditor::new()
        .map_err(|e| MarciError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "marci shell".bold().magenta());
    println!(
        "Type {} for commands, {} to exit.\n",
        "/help".yellow(),
        "/quit".yellow()
    );
    if let Some(session) = engine.current_session().await {
        print_session_banner(&session);
    }

    loop {
        let persona = engine.persona();
        let prompt = format!("{}> ", persona.to_string().magenta());
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                if let Some(command) = trimmed.strip_prefix('/') {
                    match run_command(&engine, command).await {
                        Ok(ShellFlow::Continue) => continue,
                        Ok(ShellFlow::Quit) => break,
                        Err(e) => {
                            eprintln!("{}: {e}", "error".red());
                            continue;
                        }
                    }
                }

                // Subscribed before dispatch so the first deltas cannot be
                // published ahead of the receiver.
                let rx = engine.subscribe();
                match engine.send_message(trimmed, None).await {
                    Ok(Some(handle)) => {
                        stream_turn(&engine, rx, handle, &advisor, &mut current_theme).await;
                    }
                    Ok(None) => {
                        // Dropped while in flight, or redirected to a fresh
                        // peer chat by an @mention.
                        if let Some(session) = engine.current_session().await {
                            if session.is_peer() {
                                print_session_banner(&session);
                            } else {
                                eprintln!("{}", "(a reply is still in flight)".dimmed());
                            }
                        }
                    }
                    Err(e) => eprintln!("{}: {e}", "error".red()),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    println!("{}", "bye!".dimmed());
    Ok(())
}

enum ShellFlow {
    Continue,
    Quit,
}

/// Prints engine events for the in-flight turn until its task finishes,
/// then runs the theme advisor if the turn genuinely succeeded. Takes a
/// receiver subscribed before the turn was dispatched.
async fn stream_turn(
    engine: &ChatEngine,
    mut rx: broadcast::Receiver<EngineEvent>,
    mut handle: JoinHandle<()>,
    advisor: &ThemeAdvisor,
    current_theme: &mut String,
) {
    let session_id = engine.current_session_id();
    let mut printed = false;
    let mut succeeded_prompt: Option<String> = None;
    let mut finished = false;

    loop {
        tokio::select! {
            result = &mut handle, if !finished => {
                if let Err(e) = result {
                    warn!(error = %e, "reply task panicked");
                }
                finished = true;
                // Everything the task emitted is buffered; drain and stop.
                while let Ok(event) = rx.try_recv() {
                    handle_event(event, &session_id, &mut printed, &mut succeeded_prompt);
                }
                break;
            }
            event = rx.recv() => match event {
                Ok(event) => handle_event(event, &session_id, &mut printed, &mut succeeded_prompt),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
    if printed {
        println!();
    }

    if let Some(prompt) = succeeded_prompt
        && let Some(ThemeSuggestion { theme_name, reason }) =
            advisor.suggest(&prompt, current_theme).await
    {
        println!(
            "{} {} ({})",
            "theme suggestion:".cyan(),
            theme_name.bold(),
            reason
        );
        *current_theme = theme_name;
    }
}

fn handle_event(
    event: EngineEvent,
    session_id: &str,
    printed: &mut bool,
    succeeded_prompt: &mut Option<String>,
) {
    match event {
        EngineEvent::Delta { session_id: sid, text } if sid == session_id => {
            print!("{text}");
            use std::io::Write as _;
            let _ = std::io::stdout().flush();
            *printed = true;
        }
        EngineEvent::TurnFailed { session_id: sid, message } if sid == session_id => {
            if *printed {
                println!();
                *printed = false;
            }
            eprintln!("{}", message.red());
        }
        EngineEvent::GenerationSucceeded { prompt } => {
            *succeeded_prompt = Some(prompt);
        }
        EngineEvent::MoodDetected { mood } => {
            if mood != marci_core::Mood::Default {
                eprintln!("{}", format!("(mood: {mood})").dimmed());
            }
        }
        _ => {}
    }
}

async fn run_command(engine: &ChatEngine, command: &str) -> Result<ShellFlow, MarciError> {
    let mut parts = command.splitn(2, ' ');
    let name = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).unwrap_or_default();

    match name {
        "quit" | "exit" => return Ok(ShellFlow::Quit),
        "help" => {
            println!("  /new                start a fresh chat");
            println!("  /sessions           list sessions");
            println!("  /select <id>        switch to a session (id prefix ok)");
            println!("  /delete <id>        delete a session (id prefix ok)");
            println!("  /persona <name>     switch persona (marci, ani)");
            println!("  /instruction <text> set a custom system instruction");
            println!("  /ephemeral <on|off> toggle temporary-chat mode");
            println!("  /clear              delete every session");
            println!("  /quit               exit");
            println!("  @<name> ...         start a simulated peer chat");
        }
        "new" => {
            engine.new_chat().await?;
            if let Some(session) = engine.current_session().await {
                print_session_banner(&session);
            }
        }
        "sessions" => {
            let current = engine.current_session_id();
            for session in engine.sessions().await {
                let marker = if session.id == current { "*" } else { " " };
                println!(
                    "{marker} {}  {}  [{}]  {} messages",
                    &session.id[..8.min(session.id.len())],
                    session.title,
                    session.category,
                    session.history.len()
                );
            }
        }
        "select" => {
            let id = resolve_session_id(&engine.sessions().await, arg)?;
            engine.select_session(&id).await?;
            if let Some(session) = engine.current_session().await {
                print_session_banner(&session);
                for message in &session.history {
                    print_history_message(message);
                }
            }
        }
        "delete" => {
            let id = resolve_session_id(&engine.sessions().await, arg)?;
            engine.delete_session(&id).await?;
            println!("{}", "deleted".dimmed());
            if let Some(session) = engine.current_session().await {
                print_session_banner(&session);
            }
        }
        "persona" => {
            let persona = Persona::from_str(arg)
                .map_err(|_| MarciError::Config(format!("unknown persona: {arg}")))?;
            engine.switch_persona(persona).await?;
            if let Some(session) = engine.current_session().await {
                print_session_banner(&session);
                for message in &session.history {
                    print_history_message(message);
                }
            }
        }
        "instruction" => {
            let instruction = if arg.is_empty() || arg == "clear" {
                None
            } else {
                Some(arg.to_string())
            };
            engine.set_custom_instruction(instruction).await?;
            if let Some(session) = engine.current_session().await {
                print_session_banner(&session);
            }
        }
        "ephemeral" => match arg {
            "on" => {
                engine.set_ephemeral_mode(true);
                println!("{}", "temporary-chat mode on".dimmed());
            }
            "off" => {
                engine.set_ephemeral_mode(false);
                println!("{}", "temporary-chat mode off".dimmed());
            }
            _ => {
                return Err(MarciError::Config(
                    "usage: /ephemeral <on|off>".to_string(),
                ))
            }
        },
        "clear" => {
            engine.clear_all().await?;
            println!("{}", "all sessions deleted".dimmed());
            if let Some(session) = engine.current_session().await {
                print_session_banner(&session);
            }
        }
        _ => {
            return Err(MarciError::Config(format!(
                "unknown command: /{name} (try /help)"
            )))
        }
    }
    Ok(ShellFlow::Continue)
}

/// Resolves a session id prefix to a full id. Ambiguous or unknown prefixes
/// are errors.
fn resolve_session_id(sessions: &[ChatSession], prefix: &str) -> Result<String, MarciError> {
    if prefix.is_empty() {
        return Err(MarciError::Config("a session id is required".to_string()));
    }
    let matches: Vec<&ChatSession> = sessions
        .iter()
        .filter(|s| s.id.starts_with(prefix))
        .collect();
    match matches.as_slice() {
        [session] => Ok(session.id.clone()),
        [] => Err(MarciError::Config(format!("no session matches {prefix}"))),
        _ => Err(MarciError::Config(format!(
            "{prefix} matches more than one session"
        ))),
    }
}

fn print_session_banner(session: &ChatSession) {
    println!(
        "{}",
        format!("-- {} [{}] --", session.title, session.category).cyan()
    );
}

fn print_history_message(message: &marci_core::ChatMessage) {
    let label = match (&message.sender, message.sender_name.as_deref()) {
        (Sender::User, _) => "you".green().to_string(),
        (Sender::Assistant, Some(name)) => name.magenta().to_string(),
        (Sender::Assistant, None) => "marci".magenta().to_string(),
    };
    println!("{label}: {}", message.text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use marci_core::{SessionKind, GENERAL_CATEGORY, NEW_CHAT_TITLE};

    fn session(id: &str) -> ChatSession {
        ChatSession {
            id: id.to_string(),
            user_id: "User".to_string(),
            title: NEW_CHAT_TITLE.to_string(),
            category: GENERAL_CATEGORY.to_string(),
            created_at: 0,
            history: Vec::new(),
            kind: SessionKind::Standard,
        }
    }

    #[test]
    fn session_prefix_resolution() {
        let sessions = vec![session("abc123"), session("abd999"), session("zzz000")];

        assert_eq!(resolve_session_id(&sessions, "abc").unwrap(), "abc123");
        assert_eq!(resolve_session_id(&sessions, "zzz000").unwrap(), "zzz000");
        assert!(resolve_session_id(&sessions, "ab").is_err());
        assert!(resolve_session_id(&sessions, "nope").is_err());
        assert!(resolve_session_id(&sessions, "").is_err());
    }
}
