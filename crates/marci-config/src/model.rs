// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Marci companion.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Marci configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MarciConfig {
    /// Agent identity and behavior settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Gemini API settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Speech output settings.
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Chat lifecycle settings.
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Agent identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Inline system instruction override for the default persona.
    /// Overridden by `system_instruction_file` if both set.
    #[serde(default)]
    pub system_instruction: Option<String>,

    /// Path to a file containing the system instruction.
    /// Takes precedence over `system_instruction` if both are set.
    #[serde(default)]
    pub system_instruction_file: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_instruction: None,
            system_instruction_file: None,
        }
    }
}

fn default_agent_name() -> String {
    "marci".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Gemini API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// Gemini API key. `None` requires the environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model to use for all requests.
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL override. Defaults to the public endpoint.
    #[serde(default)]
    pub api_base: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            api_base: None,
        }
    }
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("marci").join("marci.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("marci.db"))
        .to_string_lossy()
        .into_owned()
}

/// Speech output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SpeechConfig {
    /// Speak finalized assistant replies aloud.
    #[serde(default = "default_speech_enabled")]
    pub enabled: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: default_speech_enabled(),
        }
    }
}

fn default_speech_enabled() -> bool {
    true
}

/// Chat lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// Display name of the local user, used in summarization transcripts.
    #[serde(default = "default_local_user")]
    pub local_user: String,

    /// Minimum number of history entries before an untitled session is
    /// summarized.
    #[serde(default = "default_summary_threshold")]
    pub summary_threshold: usize,

    /// Lower bound of the simulated peer typing delay, in milliseconds.
    #[serde(default = "default_peer_delay_min_ms")]
    pub peer_delay_min_ms: u64,

    /// Upper bound of the simulated peer typing delay, in milliseconds.
    #[serde(default = "default_peer_delay_max_ms")]
    pub peer_delay_max_ms: u64,

    /// Minimum seconds between theme suggestions.
    #[serde(default = "default_theme_cooldown_secs")]
    pub theme_cooldown_secs: u64,

    /// Theme names the suggestion advisor may choose from.
    #[serde(default = "default_themes")]
    pub themes: Vec<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            local_user: default_local_user(),
            summary_threshold: default_summary_threshold(),
            peer_delay_min_ms: default_peer_delay_min_ms(),
            peer_delay_max_ms: default_peer_delay_max_ms(),
            theme_cooldown_secs: default_theme_cooldown_secs(),
            themes: default_themes(),
        }
    }
}

fn default_local_user() -> String {
    "User".to_string()
}

fn default_summary_threshold() -> usize {
    4
}

fn default_peer_delay_min_ms() -> u64 {
    500
}

fn default_peer_delay_max_ms() -> u64 {
    1500
}

fn default_theme_cooldown_secs() -> u64 {
    3600 // 1 hour
}

fn default_themes() -> Vec<String> {
    ["Aurora", "Sunset", "Forest", "Ocean", "Midnight"]
        .into_iter()
        .map(String::from)
        .collect()
}
