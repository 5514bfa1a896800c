// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation of configuration values.

use marci_core::MarciError;

use crate::model::MarciConfig;

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validates constraints that the serde model cannot express.
pub fn validate_config(config: &MarciConfig) -> Result<(), MarciError> {
    if !VALID_LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        return Err(MarciError::Config(format!(
            "agent.log_level must be one of {VALID_LOG_LEVELS:?}, got {:?}",
            config.agent.log_level
        )));
    }

    if config.chat.summary_threshold < 2 {
        return Err(MarciError::Config(format!(
            "chat.summary_threshold must be at least 2, got {}",
            config.chat.summary_threshold
        )));
    }

    if config.chat.peer_delay_min_ms > config.chat.peer_delay_max_ms {
        return Err(MarciError::Config(format!(
            "chat.peer_delay_min_ms ({}) must not exceed chat.peer_delay_max_ms ({})",
            config.chat.peer_delay_min_ms, config.chat.peer_delay_max_ms
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        return Err(MarciError::Config(
            "storage.database_path must not be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        validate_config(&MarciConfig::default()).unwrap();
    }

    #[test]
    fn rejects_bad_log_level() {
        let mut config = MarciConfig::default();
        config.agent.log_level = "verbose".into();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn rejects_inverted_peer_delay_band() {
        let mut config = MarciConfig::default();
        config.chat.peer_delay_min_ms = 2000;
        config.chat.peer_delay_max_ms = 1000;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("peer_delay"));
    }

    #[test]
    fn rejects_tiny_summary_threshold() {
        let mut config = MarciConfig::default();
        config.chat.summary_threshold = 1;
        assert!(validate_config(&config).is_err());
    }
}
