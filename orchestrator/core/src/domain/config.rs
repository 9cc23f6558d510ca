// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Orchestrator Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) for the AI
// orchestration core:
// - Per-call and liveness deadlines
// - Trusted migration provider pointer
// - Deployment encryption key location
// - Fallback credential environment mapping
// - Logging settings

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::provider::{ProviderId, BUILTIN_PROVIDERS};

pub const API_VERSION: &str = "geoquest.ai/v1";
pub const KIND: &str = "AiOrchestratorConfig";

/// Top-level orchestrator configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfigManifest {
    /// API version (must be "geoquest.ai/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "AiOrchestratorConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: OrchestratorConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfigSpec {
    /// Deadline for a single provider call in milliseconds
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// Deadline for a liveness probe in milliseconds
    #[serde(default = "default_liveness_timeout_ms")]
    pub liveness_timeout_ms: u64,

    /// Extra per-validator bound in a validation fan-out, on top of
    /// `call_timeout_ms`. Unset means the call timeout alone applies.
    #[serde(default)]
    pub validation_deadline_ms: Option<u64>,

    /// Provider enabled for migration by default
    #[serde(default = "default_trusted_migration_provider")]
    pub trusted_migration_provider: String,

    /// Environment variable holding the deployment encryption key
    #[serde(default = "default_encryption_key_env")]
    pub encryption_key_env: String,

    /// Provider id -> environment variable holding a fallback API key.
    /// Defaults to the built-in catalog's `*_API_KEY` names.
    #[serde(default = "default_fallback_credentials_env")]
    pub fallback_credentials_env: BTreeMap<String, String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_call_timeout_ms() -> u64 {
    60_000
}

fn default_liveness_timeout_ms() -> u64 {
    15_000
}

fn default_trusted_migration_provider() -> String {
    "anthropic".to_string()
}

fn default_encryption_key_env() -> String {
    "PROVIDER_SETTINGS_ENCRYPTION_KEY".to_string()
}

fn default_fallback_credentials_env() -> BTreeMap<String, String> {
    BUILTIN_PROVIDERS
        .iter()
        .map(|b| (b.id.to_string(), b.env_key.to_string()))
        .collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for OrchestratorConfigSpec {
    fn default() -> Self {
        Self {
            call_timeout_ms: default_call_timeout_ms(),
            liveness_timeout_ms: default_liveness_timeout_ms(),
            validation_deadline_ms: None,
            trusted_migration_provider: default_trusted_migration_provider(),
            encryption_key_env: default_encryption_key_env(),
            fallback_credentials_env: default_fallback_credentials_env(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for OrchestratorConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "geoquest-ai".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: OrchestratorConfigSpec::default(),
        }
    }
}

impl OrchestratorConfigSpec {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }

    pub fn validation_deadline(&self) -> Option<Duration> {
        self.validation_deadline_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }

    /// Falls back to the default trusted provider when the configured value
    /// is blank.
    pub fn trusted_migration_provider(&self) -> ProviderId {
        ProviderId::parse(&self.trusted_migration_provider)
            .unwrap_or_else(|| ProviderId::from_static("anthropic"))
    }
}

impl OrchestratorConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. GEOQUEST_AI_CONFIG_PATH environment variable
    /// 2. ./geoquest-ai.yaml (working directory)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("GEOQUEST_AI_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./geoquest-ai.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        None
    }

    /// Load configuration with discovery, fallback to default.
    /// A `.env` file in the working directory is loaded first when present.
    pub fn load_or_default(explicit_path: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {:?}", path);
        }

        // Explicit path must exist and parse
        if let Some(path) = explicit_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            config.validate()?;
            return Ok(config);
        }

        let mut config = if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(config_path)?
        } else {
            tracing::warn!("No configuration file found. Using defaults.");
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("GEOQUEST_AI_CALL_TIMEOUT_MS") {
            match val.trim().parse::<u64>() {
                Ok(ms) => {
                    tracing::info!("Environment override: GEOQUEST_AI_CALL_TIMEOUT_MS={}", ms);
                    self.spec.call_timeout_ms = ms;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for GEOQUEST_AI_CALL_TIMEOUT_MS: '{}'. Expected milliseconds. Ignoring.",
                        val
                    );
                }
            }
        }

        if let Ok(val) = std::env::var("GEOQUEST_AI_TRUSTED_MIGRATION_PROVIDER") {
            if val.trim().is_empty() {
                tracing::warn!("Empty GEOQUEST_AI_TRUSTED_MIGRATION_PROVIDER. Ignoring.");
            } else {
                tracing::info!(
                    "Environment override: GEOQUEST_AI_TRUSTED_MIGRATION_PROVIDER={}",
                    val
                );
                self.spec.trusted_migration_provider = val.trim().to_lowercase();
            }
        }

        if let Ok(val) = std::env::var("GEOQUEST_AI_LOG_LEVEL") {
            if !val.trim().is_empty() {
                self.spec.logging.level = val.trim().to_string();
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.call_timeout_ms == 0 {
            anyhow::bail!("spec.call_timeout_ms must be greater than zero");
        }

        if self.spec.liveness_timeout_ms == 0 {
            anyhow::bail!("spec.liveness_timeout_ms must be greater than zero");
        }

        if self.spec.trusted_migration_provider.trim().is_empty() {
            anyhow::bail!("spec.trusted_migration_provider cannot be empty");
        }

        if self.spec.encryption_key_env.trim().is_empty() {
            anyhow::bail!("spec.encryption_key_env cannot be empty");
        }

        match self.spec.logging.format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("Invalid logging.format: '{}'. Must be 'json' or 'text'", other),
        }

        Ok(())
    }
}
