// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Marci companion.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, and environment
//! variable overrides.
//!
//! # Usage
//!
//! ```no_run
//! use marci_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("Agent name: {}", config.agent.name);
//! ```

pub mod loader;
pub mod model;
pub mod validation;

use marci_core::MarciError;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    AgentConfig, ChatConfig, GeminiConfig, MarciConfig, SpeechConfig, StorageConfig,
};

/// Load configuration from the XDG hierarchy and validate it.
pub fn load_and_validate() -> Result<MarciConfig, MarciError> {
    let config = loader::load_config().map_err(|e| MarciError::Config(e.to_string()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<MarciConfig, MarciError> {
    let config =
        loader::load_config_from_str(toml_content).map_err(|e| MarciError::Config(e.to_string()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Load configuration from a specific file path and validate it.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<MarciConfig, MarciError> {
    let config =
        loader::load_config_from_path(path).map_err(|e| MarciError::Config(e.to_string()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Resolve the configured system-instruction override for the default persona.
///
/// `system_instruction_file` takes precedence over the inline string.
/// Returns `None` when neither is configured, leaving the built-in default.
pub fn resolve_system_instruction(config: &MarciConfig) -> Result<Option<String>, MarciError> {
    if let Some(path) = &config.agent.system_instruction_file {
        let text = std::fs::read_to_string(path).map_err(|e| {
            MarciError::Config(format!("cannot read agent.system_instruction_file {path:?}: {e}"))
        })?;
        return Ok(Some(text.trim().to_string()));
    }
    Ok(config.agent.system_instruction.clone())
}
