// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Marci, a personal AI companion.
//!
//! Binary entry point. Loads configuration, initializes tracing, and runs
//! the interactive shell.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod shell;
mod speech;

/// Marci, a personal AI companion.
#[derive(Parser, Debug)]
#[command(name = "marci", version, about, long_about = None)]
struct Cli {
    /// Path to a configuration file, bypassing the XDG lookup.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch the interactive chat shell (the default).
    Shell,
    /// Print the resolved configuration and exit.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => marci_config::load_and_validate_path(path),
        None => marci_config::load_and_validate(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("marci: configuration error: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.agent.log_level);

    match cli.command {
        Some(Commands::Config) => {
            println!("agent.name = {}", config.agent.name);
            println!("agent.log_level = {}", config.agent.log_level);
            println!("gemini.model = {}", config.gemini.model);
            println!(
                "gemini.api_key = {}",
                if config.gemini.api_key.is_some() { "(set)" } else { "(unset)" }
            );
            println!("storage.database_path = {}", config.storage.database_path);
            println!("speech.enabled = {}", config.speech.enabled);
            println!("chat.local_user = {}", config.chat.local_user);
            println!("chat.summary_threshold = {}", config.chat.summary_threshold);
            println!("chat.themes = {}", config.chat.themes.join(", "));
        }
        Some(Commands::Shell) | None => {
            if let Err(e) = shell::run_shell(config).await {
                eprintln!("marci: {e}");
                std::process::exit(1);
            }
        }
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("marci={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn binary_loads_config_defaults() {
        let config = marci_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.agent.name, "marci");
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
    }
}
