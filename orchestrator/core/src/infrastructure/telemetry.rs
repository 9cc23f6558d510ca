// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Tracing initialisation
//
// RUST_LOG takes precedence over the configured level.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::domain::config::LoggingConfig;

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    match config.format.as_str() {
        "json" => builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e)),
        _ => builder
            .compact()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_install_is_rejected() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            format: "text".to_string(),
        };
        assert!(init_tracing(&config).is_ok());
        assert!(init_tracing(&config).is_err());
    }
}
