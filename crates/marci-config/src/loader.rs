// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./marci.toml` > `~/.config/marci/marci.toml` > `/etc/marci/marci.toml`
//! with environment variable overrides via `MARCI_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::MarciConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/marci/marci.toml` (system-wide)
/// 3. `~/.config/marci/marci.toml` (user XDG config)
/// 4. `./marci.toml` (local directory)
/// 5. `MARCI_*` environment variables
pub fn load_config() -> Result<MarciConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MarciConfig::default()))
        .merge(Toml::file("/etc/marci/marci.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("marci/marci.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("marci.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and callers that supply their own config text.
pub fn load_config_from_str(toml_content: &str) -> Result<MarciConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MarciConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MarciConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MarciConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `MARCI_GEMINI_API_KEY` must
/// map to `gemini.api_key`, not `gemini.api.key`.
fn env_provider() -> Env {
    Env::prefixed("MARCI_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: MARCI_GEMINI_API_KEY -> "gemini_api_key"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("gemini_", "gemini.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("speech_", "speech.", 1)
            .replacen("chat_", "chat.", 1);
        mapped.into()
    })
}
