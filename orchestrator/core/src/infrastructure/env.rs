// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Process-level fallback credentials
//
// Built-in providers may be credentialed through `*_API_KEY` environment
// variables. Custom providers never fall back; their ids are absent from
// the mapping.

use std::collections::BTreeMap;

use crate::domain::config::OrchestratorConfigSpec;
use crate::domain::credential::{ApiSecret, FallbackCredentials};
use crate::domain::provider::{ProviderId, BUILTIN_PROVIDERS};

/// Reads fallback keys from the process environment at lookup time.
#[derive(Debug, Clone)]
pub struct EnvFallbackCredentials {
    vars: BTreeMap<ProviderId, String>,
}

impl EnvFallbackCredentials {
    pub fn new(vars: BTreeMap<ProviderId, String>) -> Self {
        Self { vars }
    }

    /// Mapping from configuration. Entries for non-built-in ids are ignored.
    pub fn from_config(spec: &OrchestratorConfigSpec) -> Self {
        let vars = spec
            .fallback_credentials_env
            .iter()
            .filter_map(|(id, var)| {
                let id = ProviderId::parse(id)?;
                if !id.is_builtin() {
                    tracing::warn!(provider = %id, "Ignoring fallback credential mapping for non built-in provider");
                    return None;
                }
                Some((id, var.clone()))
            })
            .collect();
        Self { vars }
    }

    pub fn builtin_defaults() -> Self {
        Self {
            vars: BUILTIN_PROVIDERS
                .iter()
                .map(|b| (b.provider_id(), b.env_key.to_string()))
                .collect(),
        }
    }
}

impl FallbackCredentials for EnvFallbackCredentials {
    fn lookup(&self, provider: &ProviderId) -> Option<ApiSecret> {
        let var = self.vars.get(provider)?;
        std::env::var(var).ok().and_then(ApiSecret::new)
    }
}

/// Fixed in-memory credentials.
#[derive(Debug, Clone, Default)]
pub struct StaticFallbackCredentials {
    secrets: BTreeMap<ProviderId, ApiSecret>,
}

impl StaticFallbackCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: &str, secret: &str) -> Self {
        if let (Some(id), Some(secret)) = (ProviderId::parse(provider), ApiSecret::new(secret)) {
            self.secrets.insert(id, secret);
        }
        self
    }
}

impl FallbackCredentials for StaticFallbackCredentials {
    fn lookup(&self, provider: &ProviderId) -> Option<ApiSecret> {
        self.secrets.get(provider).cloned()
    }
}
