// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Provider Config Snapshot
//!
//! One consolidated, immutable view per orchestration cycle merging each
//! provider's descriptor, effective credential and purpose enablement.
//!
//! Eligibility for a purpose `P`:
//!
//! ```text
//! eligible(p, P) = credentialed(p) && enabled(p) && available(p) && purpose_enabled(p, P)
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::credential::{ApiSecret, CredentialSource};
use super::provider::{ProviderDescriptor, ProviderId};
use super::purpose::{EnablementMatrix, Purpose, PurposeEnablement};

/// Fully resolved configuration of one provider.
#[derive(Debug, Clone)]
pub struct ResolvedProviderConfig {
    pub descriptor: ProviderDescriptor,
    /// Effective credential after precedence; `None` makes the provider
    /// ineligible for every purpose.
    pub credential: Option<ApiSecret>,
    /// Where a credential exists, even when the snapshot was loaded without
    /// decrypting it.
    pub key_source: Option<CredentialSource>,
    pub key_hint: Option<String>,
    pub is_enabled: bool,
    pub is_available: bool,
    pub purposes: PurposeEnablement,
}

impl ResolvedProviderConfig {
    pub fn id(&self) -> &ProviderId {
        &self.descriptor.id
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// With `None`, eligibility ignores per-purpose switches.
    pub fn is_eligible(&self, purpose: Option<Purpose>) -> bool {
        self.has_credential()
            && self.is_enabled
            && self.is_available
            && purpose.is_none_or(|p| self.purposes.get(p))
    }

    /// Secret-free view for admin surfaces.
    pub fn public_view(&self) -> ProviderSettingsView {
        ProviderSettingsView {
            id: self.descriptor.id.clone(),
            label: self.descriptor.label.clone(),
            family: self.descriptor.family.as_str().to_string(),
            model: self.descriptor.model.clone(),
            base_url: self.descriptor.base_url.clone(),
            extra_headers: self.descriptor.extra_headers.keys().cloned().collect(),
            supports_response_format: self.descriptor.capabilities.structured_output,
            max_questions_per_request: self.descriptor.capabilities.max_batch_size,
            is_custom: self.descriptor.is_custom,
            is_enabled: self.is_enabled,
            is_available: self.is_available,
            has_api_key: self.key_source.is_some(),
            key_source: self.key_source,
            api_key_hint: self.key_hint.clone(),
            purposes: self.purposes,
        }
    }
}

/// What an admin settings surface may see. Carries no secret; header values
/// are omitted as they can hold gateway tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettingsView {
    pub id: ProviderId,
    pub label: String,
    pub family: String,
    pub model: String,
    pub base_url: String,
    pub extra_headers: Vec<String>,
    pub supports_response_format: bool,
    pub max_questions_per_request: u32,
    pub is_custom: bool,
    pub is_enabled: bool,
    pub is_available: bool,
    pub has_api_key: bool,
    pub key_source: Option<CredentialSource>,
    pub api_key_hint: Option<String>,
    pub purposes: PurposeEnablement,
}

#[derive(Debug, Clone, Default)]
pub struct ProviderConfigSnapshot {
    configs: BTreeMap<ProviderId, ResolvedProviderConfig>,
}

impl ProviderConfigSnapshot {
    pub fn new(configs: impl IntoIterator<Item = ResolvedProviderConfig>) -> Self {
        Self {
            configs: configs.into_iter().map(|c| (c.id().clone(), c)).collect(),
        }
    }

    pub fn get(&self, id: &ProviderId) -> Option<&ResolvedProviderConfig> {
        self.configs.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedProviderConfig> {
        self.configs.values()
    }

    pub fn ids(&self) -> Vec<ProviderId> {
        self.configs.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Purpose x provider switches as stored, independent of credentials.
    pub fn enablement_matrix(&self) -> EnablementMatrix {
        let mut matrix = EnablementMatrix::new();
        for purpose in Purpose::ALL {
            let column = self
                .configs
                .iter()
                .map(|(id, c)| (id.clone(), c.purposes.get(purpose)))
                .collect();
            matrix.insert(purpose, column);
        }
        matrix
    }

    pub fn eligible(&self, purpose: Option<Purpose>) -> Vec<ProviderId> {
        self.configs
            .values()
            .filter(|c| c.is_eligible(purpose))
            .map(|c| c.id().clone())
            .collect()
    }

    pub fn public_view(&self) -> Vec<ProviderSettingsView> {
        self.configs.values().map(ResolvedProviderConfig::public_view).collect()
    }
}
