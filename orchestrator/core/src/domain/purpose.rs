// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Purpose Enablement
//
// Each provider is enabled or disabled independently for every purpose.
// Defaults: generation/validation on, illustration on for built-ins only,
// migration on for the single trusted provider only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::provider::ProviderId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    Generation,
    Validation,
    Illustration,
    Migration,
}

impl Purpose {
    pub const ALL: [Purpose; 4] = [
        Purpose::Generation,
        Purpose::Validation,
        Purpose::Illustration,
        Purpose::Migration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generation => "generation",
            Self::Validation => "validation",
            Self::Illustration => "illustration",
            Self::Migration => "migration",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == value.trim().to_lowercase())
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-purpose switches for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurposeEnablement {
    pub generation: bool,
    pub validation: bool,
    pub illustration: bool,
    pub migration: bool,
}

impl PurposeEnablement {
    /// Defaults for a provider. Custom endpoints are untrusted for
    /// illustration and migration; migration is on only for the trusted id.
    pub fn defaults_for(provider: &ProviderId, is_custom: bool, trusted_migration: &ProviderId) -> Self {
        Self {
            generation: true,
            validation: true,
            illustration: !is_custom,
            migration: !is_custom && provider == trusted_migration,
        }
    }

    pub fn get(&self, purpose: Purpose) -> bool {
        match purpose {
            Purpose::Generation => self.generation,
            Purpose::Validation => self.validation,
            Purpose::Illustration => self.illustration,
            Purpose::Migration => self.migration,
        }
    }

    pub fn set(&mut self, purpose: Purpose, enabled: bool) {
        match purpose {
            Purpose::Generation => self.generation = enabled,
            Purpose::Validation => self.validation = enabled,
            Purpose::Illustration => self.illustration = enabled,
            Purpose::Migration => self.migration = enabled,
        }
    }

    pub fn any(&self) -> bool {
        Purpose::ALL.iter().any(|p| self.get(*p))
    }

    /// Overlays a stored JSON object on top of `defaults`. Keys that are
    /// missing or not booleans keep their default; unparseable input yields
    /// the defaults unchanged.
    pub fn merge_stored(stored: Option<&str>, defaults: Self) -> Self {
        let Some(raw) = stored.filter(|s| !s.trim().is_empty()) else {
            return defaults;
        };
        let parsed: serde_json::Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable purpose settings, falling back to defaults");
                return defaults;
            }
        };

        let mut merged = defaults;
        if let Some(object) = parsed.as_object() {
            for purpose in Purpose::ALL {
                if let Some(flag) = object.get(purpose.as_str()).and_then(|v| v.as_bool()) {
                    merged.set(purpose, flag);
                }
            }
        }
        merged
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Per-purpose switches as submitted by an administrator. Missing or
/// non-boolean entries are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurposeOverrides {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub generation: Option<bool>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub validation: Option<bool>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub illustration: Option<bool>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub migration: Option<bool>,
}

impl PurposeOverrides {
    pub fn get(&self, purpose: Purpose) -> Option<bool> {
        match purpose {
            Purpose::Generation => self.generation,
            Purpose::Validation => self.validation,
            Purpose::Illustration => self.illustration,
            Purpose::Migration => self.migration,
        }
    }

    pub fn over(&self, defaults: PurposeEnablement) -> PurposeEnablement {
        let mut merged = defaults;
        for purpose in Purpose::ALL {
            if let Some(flag) = self.get(purpose) {
                merged.set(purpose, flag);
            }
        }
        merged
    }
}

impl From<PurposeEnablement> for PurposeOverrides {
    fn from(value: PurposeEnablement) -> Self {
        Self {
            generation: Some(value.generation),
            validation: Some(value.validation),
            illustration: Some(value.illustration),
            migration: Some(value.migration),
        }
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_bool()))
}

/// Purpose × provider matrix reported to callers.
pub type EnablementMatrix = BTreeMap<Purpose, BTreeMap<ProviderId, bool>>;
