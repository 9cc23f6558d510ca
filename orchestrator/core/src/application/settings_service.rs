// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Provider settings service
//!
//! Loads the per-cycle [`ProviderConfigSnapshot`] from the row store and
//! applies administrative saves.
//!
//! - Built-in rows are seeded on first access. Seeding is idempotent.
//! - Credential precedence: stored secret, then process fallback (built-ins
//!   only), then absent.
//! - A stored secret that fails to decrypt makes only that provider
//!   ineligible; the rest of the snapshot loads normally.
//! - A save re-encrypts a credential only when a non-empty value is given.
//!   Saved secrets are never returned, only their hint.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::credential::{ApiSecret, CredentialSource, CryptoError, FallbackCredentials, SecretCipher};
use crate::domain::provider::{
    BuiltinProvider, ProviderCapabilities, ProviderDescriptor, ProviderFamily, ProviderId,
    BUILTIN_PROVIDERS, DEFAULT_MAX_BATCH_SIZE,
};
use crate::domain::purpose::{PurposeEnablement, PurposeOverrides};
use crate::domain::repository::{ProviderSettingsRow, ProviderSettingsStore, RepositoryError, RowPatch};
use crate::domain::settings::{ProviderConfigSnapshot, ProviderSettingsView, ResolvedProviderConfig};

const PROVIDER_TYPE_BUILTIN: &str = "builtin";
const PROVIDER_TYPE_CUSTOM: &str = "openai_compat";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("Cannot store a credential for '{provider}': encryption key is not configured")]
    EncryptionUnavailable { provider: ProviderId },

    #[error("Custom provider '{provider}' requires a base URL")]
    MissingBaseUrl { provider: ProviderId },

    #[error("'{provider}' is a built-in provider id")]
    ReservedId { provider: ProviderId },

    #[error("Built-in provider '{provider}' cannot be deleted, only disabled")]
    BuiltinNotDeletable { provider: ProviderId },
}

/// One provider entry of an administrative save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettingsInput {
    pub id: ProviderId,
    /// Purposes left out fall back to the provider's defaults.
    #[serde(default)]
    pub purposes: PurposeOverrides,
    #[serde(default)]
    pub model: Option<String>,
    /// Cleartext credential. Blank or absent keeps the stored one.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_custom: bool,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub extra_headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub supports_response_format: Option<bool>,
    #[serde(default)]
    pub max_questions_per_request: Option<u32>,
    #[serde(default)]
    pub is_available: Option<bool>,
}

impl ProviderSettingsInput {
    pub fn new(id: ProviderId, purposes: PurposeEnablement) -> Self {
        Self {
            id,
            purposes: purposes.into(),
            model: None,
            api_key: None,
            display_name: None,
            is_custom: false,
            base_url: None,
            extra_headers: None,
            supports_response_format: None,
            max_questions_per_request: None,
            is_available: None,
        }
    }
}

/// Full administrative save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPayload {
    pub providers: Vec<ProviderSettingsInput>,
    /// Complete list of custom provider ids to keep. When present, every
    /// stored custom row not named here is deleted with its credential.
    /// When absent, no custom row is removed.
    #[serde(default)]
    pub custom_providers: Option<Vec<ProviderId>>,
}

impl SettingsPayload {
    pub fn new(providers: Vec<ProviderSettingsInput>) -> Self {
        Self {
            providers,
            custom_providers: None,
        }
    }

    pub fn with_custom_providers(mut self, ids: Vec<ProviderId>) -> Self {
        self.custom_providers = Some(ids);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveReport {
    pub saved: Vec<ProviderId>,
    pub removed: Vec<ProviderId>,
    /// Providers whose credential was replaced.
    pub rekeyed: Vec<ProviderId>,
}

pub struct ProviderSettingsService {
    store: Arc<dyn ProviderSettingsStore>,
    cipher: Option<Arc<dyn SecretCipher>>,
    fallback: Arc<dyn FallbackCredentials>,
    trusted_migration: ProviderId,
}

impl ProviderSettingsService {
    /// `cipher` is `None` when no deployment key is configured; stored
    /// secrets are then unreadable and new ones cannot be saved.
    pub fn new(
        store: Arc<dyn ProviderSettingsStore>,
        cipher: Option<Arc<dyn SecretCipher>>,
        fallback: Arc<dyn FallbackCredentials>,
        trusted_migration: ProviderId,
    ) -> Self {
        Self {
            store,
            cipher,
            fallback,
            trusted_migration,
        }
    }

    /// Inserts every missing built-in row. Returns how many were created.
    pub async fn seed_builtins(&self) -> Result<usize, SettingsError> {
        let mut created = 0;
        for builtin in BUILTIN_PROVIDERS {
            let id = builtin.provider_id();
            let defaults = PurposeEnablement::defaults_for(&id, false, &self.trusted_migration);
            let mut row = ProviderSettingsRow::new(id);
            row.purpose_settings = Some(defaults.to_json());
            row.model = Some(builtin.default_model.to_string());
            row.display_name = Some(builtin.label.to_string());
            row.provider_type = Some(PROVIDER_TYPE_BUILTIN.to_string());
            row.max_questions_per_request = Some(DEFAULT_MAX_BATCH_SIZE);

            if self.store.insert_if_missing(row).await? {
                created += 1;
            }
        }
        if created > 0 {
            info!(created, "Seeded built-in provider settings");
        }
        Ok(created)
    }

    /// Loads the consolidated snapshot. With `decrypt_secrets = false` no
    /// secret is materialized; key source and hint are still reported.
    pub async fn load_snapshot(&self, decrypt_secrets: bool) -> Result<ProviderConfigSnapshot, SettingsError> {
        self.seed_builtins().await?;
        let rows = self.store.list_rows().await?;
        let configs: Vec<ResolvedProviderConfig> = rows
            .iter()
            .map(|row| self.resolve(row, decrypt_secrets))
            .collect();

        debug!(
            providers = configs.len(),
            credentialed = configs.iter().filter(|c| c.has_credential()).count(),
            decrypt_secrets,
            "Loaded provider settings snapshot"
        );
        Ok(ProviderConfigSnapshot::new(configs))
    }

    /// Secret-free settings for admin surfaces.
    pub async fn public_settings(&self) -> Result<Vec<ProviderSettingsView>, SettingsError> {
        Ok(self.load_snapshot(false).await?.public_view())
    }

    fn resolve(&self, row: &ProviderSettingsRow, decrypt_secrets: bool) -> ResolvedProviderConfig {
        let id = row.provider_id.clone();
        let builtin = BuiltinProvider::lookup(&id);
        let is_custom = row.is_custom || builtin.is_none();

        let family = if is_custom {
            ProviderFamily::OpenAiCompat
        } else {
            row.provider_type
                .as_deref()
                .and_then(|t| ProviderFamily::from_provider_type(t, &id))
                .or(builtin.map(|b| b.family))
                .unwrap_or(ProviderFamily::OpenAiCompat)
        };

        let model = row
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .or_else(|| builtin.map(|b| b.default_model.to_string()))
            .unwrap_or_default();

        let label = row
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .or_else(|| builtin.map(|b| b.label.to_string()))
            .unwrap_or_else(|| id.to_string());

        let base_url = match (is_custom, builtin) {
            (false, Some(b)) => b.base_url.to_string(),
            _ => row.base_url.clone().unwrap_or_default(),
        };

        let capabilities = ProviderCapabilities {
            structured_output: row
                .supports_response_format
                .unwrap_or(family != ProviderFamily::Anthropic),
            max_batch_size: row
                .max_questions_per_request
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_BATCH_SIZE),
        };

        let defaults = PurposeEnablement::defaults_for(&id, is_custom, &self.trusted_migration);
        let purposes = PurposeEnablement::merge_stored(row.purpose_settings.as_deref(), defaults);

        let (credential, key_source, key_hint) = self.resolve_credential(row, is_custom, decrypt_secrets);

        ResolvedProviderConfig {
            descriptor: ProviderDescriptor {
                id,
                label,
                family,
                model,
                base_url,
                extra_headers: parse_headers(row),
                capabilities,
                is_custom,
            },
            credential,
            key_source,
            key_hint,
            is_enabled: row.is_enabled,
            is_available: row.is_available,
            purposes,
        }
    }

    fn resolve_credential(
        &self,
        row: &ProviderSettingsRow,
        is_custom: bool,
        decrypt_secrets: bool,
    ) -> (Option<ApiSecret>, Option<CredentialSource>, Option<String>) {
        if row.has_stored_credential() {
            let hint = row.api_key_hint.clone();
            if !decrypt_secrets {
                return (None, Some(CredentialSource::Db), hint);
            }
            let blob = row.encrypted_api_key.as_deref().unwrap_or_default();
            let decrypted = match &self.cipher {
                Some(cipher) => cipher.decrypt(blob),
                None => Err(CryptoError::MissingKey),
            };
            return match decrypted {
                Ok(plain) => {
                    let secret = ApiSecret::new(plain);
                    let hint = hint.or_else(|| secret.as_ref().map(ApiSecret::hint));
                    (secret, Some(CredentialSource::Db), hint)
                }
                Err(e) => {
                    warn!(provider = %row.provider_id, error = %e, "Stored credential could not be decrypted, provider is ineligible");
                    (None, Some(CredentialSource::Db), hint)
                }
            };
        }

        if is_custom {
            return (None, None, None);
        }
        match self.fallback.lookup(&row.provider_id) {
            Some(secret) => {
                let hint = Some(secret.hint());
                let credential = decrypt_secrets.then_some(secret);
                (credential, Some(CredentialSource::Env), hint)
            }
            None => (None, None, None),
        }
    }

    /// Applies an administrative save.
    pub async fn save_snapshot(&self, payload: SettingsPayload) -> Result<SaveReport, SettingsError> {
        // Reject the whole payload before touching any row.
        for input in &payload.providers {
            let builtin = input.id.is_builtin();
            if input.is_custom && builtin {
                return Err(SettingsError::ReservedId {
                    provider: input.id.clone(),
                });
            }
            let custom = input.is_custom || !builtin;
            let has_base_url = input.base_url.as_deref().is_some_and(|u| !u.trim().is_empty());
            if custom && !has_base_url {
                return Err(SettingsError::MissingBaseUrl {
                    provider: input.id.clone(),
                });
            }
            if input.api_key.as_deref().is_some_and(|k| !k.trim().is_empty()) && self.cipher.is_none() {
                return Err(SettingsError::EncryptionUnavailable {
                    provider: input.id.clone(),
                });
            }
        }

        self.seed_builtins().await?;

        let mut report = SaveReport::default();
        for input in payload.providers.iter() {
            let (patch, rekeyed) = self.patch_for(input)?;
            self.store.upsert_row(&input.id, patch).await?;
            report.saved.push(input.id.clone());
            if rekeyed {
                report.rekeyed.push(input.id.clone());
            }
        }

        if let Some(keep) = &payload.custom_providers {
            report.removed = self.remove_custom_except(keep).await?;
        }

        info!(
            saved = report.saved.len(),
            removed = report.removed.len(),
            rekeyed = report.rekeyed.len(),
            "Saved provider settings"
        );
        Ok(report)
    }

    async fn remove_custom_except(&self, keep: &[ProviderId]) -> Result<Vec<ProviderId>, SettingsError> {
        let keep: BTreeSet<&ProviderId> = keep.iter().collect();
        let mut removed = Vec::new();
        for row in self.store.list_rows().await? {
            let custom = row.is_custom && !row.provider_id.is_builtin();
            if custom && !keep.contains(&row.provider_id) && self.store.delete_row(&row.provider_id).await? {
                info!(provider = %row.provider_id, "Removed custom provider absent from settings");
                removed.push(row.provider_id);
            }
        }
        Ok(removed)
    }

    fn patch_for(&self, input: &ProviderSettingsInput) -> Result<(RowPatch, bool), SettingsError> {
        let custom = input.is_custom || !input.id.is_builtin();
        let purposes = input
            .purposes
            .over(PurposeEnablement::defaults_for(&input.id, custom, &self.trusted_migration));
        let mut patch = RowPatch {
            is_enabled: Some(purposes.any()),
            is_available: input.is_available,
            purpose_settings: Some(purposes.to_json()),
            model: non_blank(input.model.as_deref()),
            display_name: non_blank(input.display_name.as_deref()),
            provider_type: Some(if custom { PROVIDER_TYPE_CUSTOM } else { PROVIDER_TYPE_BUILTIN }.to_string()),
            supports_response_format: input.supports_response_format,
            max_questions_per_request: input.max_questions_per_request.map(Some),
            is_custom: Some(custom),
            ..RowPatch::default()
        };

        // Built-in endpoints are fixed by the catalog; headers apply to any provider.
        if custom {
            patch.base_url = Some(non_blank(input.base_url.as_deref()));
        }
        if let Some(headers) = &input.extra_headers {
            patch.extra_headers = Some(Some(serde_json::to_string(headers).map_err(RepositoryError::from)?));
        }

        let mut rekeyed = false;
        if let Some(secret) = input.api_key.as_deref().and_then(ApiSecret::new) {
            let cipher = self.cipher.as_ref().ok_or_else(|| SettingsError::EncryptionUnavailable {
                provider: input.id.clone(),
            })?;
            let blob = cipher.encrypt(secret.expose())?;
            patch.credential = Some((blob, secret.hint()));
            rekeyed = true;
        }
        Ok((patch, rekeyed))
    }

    /// Deletes a custom provider. Built-ins can only be disabled.
    pub async fn delete_custom(&self, id: &ProviderId) -> Result<bool, SettingsError> {
        if id.is_builtin() {
            return Err(SettingsError::BuiltinNotDeletable { provider: id.clone() });
        }
        let removed = self.store.delete_row(id).await?;
        if removed {
            info!(provider = %id, "Deleted custom provider");
        }
        Ok(removed)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn parse_headers(row: &ProviderSettingsRow) -> BTreeMap<String, String> {
    let Some(raw) = row.extra_headers.as_deref().filter(|s| !s.trim().is_empty()) else {
        return BTreeMap::new();
    };
    match serde_json::from_str::<BTreeMap<String, serde_json::Value>>(raw) {
        Ok(map) => map
            .into_iter()
            .filter_map(|(name, value)| match value {
                serde_json::Value::String(s) => Some((name, s)),
                serde_json::Value::Number(n) => Some((name, n.to_string())),
                serde_json::Value::Bool(b) => Some((name, b.to_string())),
                _ => None,
            })
            .collect(),
        Err(e) => {
            warn!(provider = %row.provider_id, error = %e, "Unreadable extra headers, ignoring");
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::purpose::Purpose;
    use crate::infrastructure::crypto::AesGcmCipher;
    use crate::infrastructure::env::StaticFallbackCredentials;
    use crate::infrastructure::repositories::InMemoryProviderSettingsStore;

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    fn id(value: &str) -> ProviderId {
        ProviderId::parse(value).unwrap()
    }

    fn service_with(
        store: Arc<InMemoryProviderSettingsStore>,
        fallback: StaticFallbackCredentials,
    ) -> ProviderSettingsService {
        let cipher: Arc<dyn SecretCipher> = Arc::new(AesGcmCipher::from_key_material(KEY).unwrap());
        ProviderSettingsService::new(store, Some(cipher), Arc::new(fallback), id("anthropic"))
    }

    fn custom_input(name: &str) -> ProviderSettingsInput {
        let mut input = ProviderSettingsInput::new(
            id(name),
            PurposeEnablement::defaults_for(&id(name), true, &id("anthropic")),
        );
        input.is_custom = true;
        input.base_url = Some("http://gpu-box:8000/v1".into());
        input.model = Some("qwen2.5".into());
        input.api_key = Some("local-key-0001".into());
        input
    }

    #[tokio::test]
    async fn test_seeding_is_idempotent() {
        let store = Arc::new(InMemoryProviderSettingsStore::new());
        let service = service_with(store.clone(), StaticFallbackCredentials::new());

        assert_eq!(service.seed_builtins().await.unwrap(), BUILTIN_PROVIDERS.len());
        assert_eq!(service.seed_builtins().await.unwrap(), 0);
        assert_eq!(store.len(), BUILTIN_PROVIDERS.len());
    }

    #[tokio::test]
    async fn test_stored_credential_beats_fallback() {
        let store = Arc::new(InMemoryProviderSettingsStore::new());
        let service = service_with(store, StaticFallbackCredentials::new().with("openai", "sk-env-0000"));

        let mut input = ProviderSettingsInput::new(
            id("openai"),
            PurposeEnablement::defaults_for(&id("openai"), false, &id("anthropic")),
        );
        input.api_key = Some("sk-stored-1111".into());
        service
            .save_snapshot(SettingsPayload::new(vec![input]))
            .await
            .unwrap();

        let snapshot = service.load_snapshot(true).await.unwrap();
        let openai = snapshot.get(&id("openai")).unwrap();
        assert_eq!(openai.credential.as_ref().unwrap().expose(), "sk-stored-1111");
        assert_eq!(openai.key_source, Some(CredentialSource::Db));
        assert_eq!(openai.key_hint.as_deref(), Some("1111"));
    }

    #[tokio::test]
    async fn test_fallback_used_for_builtins_only() {
        let store = Arc::new(InMemoryProviderSettingsStore::new());
        let service = service_with(store, StaticFallbackCredentials::new().with("groq", "gsk-env-2222"));
        let snapshot = service.load_snapshot(true).await.unwrap();

        let groq = snapshot.get(&id("groq")).unwrap();
        assert_eq!(groq.key_source, Some(CredentialSource::Env));
        assert!(groq.has_credential());
        assert!(!snapshot.get(&id("mistral")).unwrap().has_credential());
    }

    #[tokio::test]
    async fn test_undecryptable_credential_isolated_to_one_provider() {
        let store = Arc::new(InMemoryProviderSettingsStore::new());
        let service = service_with(store.clone(), StaticFallbackCredentials::new());

        let mut gemini = ProviderSettingsInput::new(
            id("gemini"),
            PurposeEnablement::defaults_for(&id("gemini"), false, &id("anthropic")),
        );
        gemini.api_key = Some("g-key-3333".into());
        let mut mistral = ProviderSettingsInput::new(
            id("mistral"),
            PurposeEnablement::defaults_for(&id("mistral"), false, &id("anthropic")),
        );
        mistral.api_key = Some("m-key-4444".into());
        service
            .save_snapshot(SettingsPayload::new(vec![gemini, mistral]))
            .await
            .unwrap();

        store
            .upsert_row(
                &id("gemini"),
                RowPatch {
                    credential: Some(("garbage.blob".into(), "3333".into())),
                    ..RowPatch::default()
                },
            )
            .await
            .unwrap();

        let snapshot = service.load_snapshot(true).await.unwrap();
        assert!(!snapshot.get(&id("gemini")).unwrap().has_credential());
        assert!(snapshot.get(&id("mistral")).unwrap().has_credential());
        assert_eq!(snapshot.eligible(Some(Purpose::Generation)), vec![id("mistral")]);
    }

    #[tokio::test]
    async fn test_custom_provider_lifecycle() {
        let store = Arc::new(InMemoryProviderSettingsStore::new());
        let service = service_with(store.clone(), StaticFallbackCredentials::new());

        let mut input = custom_input("local-vllm");
        input.extra_headers = Some(BTreeMap::from([("X-Tenant".to_string(), "quiz".to_string())]));
        service
            .save_snapshot(SettingsPayload::new(vec![input]))
            .await
            .unwrap();

        let snapshot = service.load_snapshot(true).await.unwrap();
        let custom = snapshot.get(&id("local-vllm")).unwrap();
        assert!(custom.descriptor.is_custom);
        assert_eq!(custom.descriptor.family, ProviderFamily::OpenAiCompat);
        assert_eq!(custom.descriptor.extra_headers["X-Tenant"], "quiz");
        assert!(custom.descriptor.capabilities.structured_output);
        assert!(!custom.purposes.illustration);
        assert!(!custom.purposes.migration);

        let report = service
            .save_snapshot(SettingsPayload::default().with_custom_providers(Vec::new()))
            .await
            .unwrap();
        assert_eq!(report.removed, vec![id("local-vllm")]);
        assert!(store.get_row(&id("local-vllm")).await.unwrap().is_none());
        assert_eq!(store.len(), BUILTIN_PROVIDERS.len());
    }

    #[tokio::test]
    async fn test_builtin_only_save_keeps_custom_rows() {
        let store = Arc::new(InMemoryProviderSettingsStore::new());
        let service = service_with(store.clone(), StaticFallbackCredentials::new());
        service
            .save_snapshot(SettingsPayload::new(vec![custom_input("local-vllm")]))
            .await
            .unwrap();

        let mut openai = ProviderSettingsInput::new(
            id("openai"),
            PurposeEnablement::defaults_for(&id("openai"), false, &id("anthropic")),
        );
        openai.model = Some("gpt-4.1-mini".into());
        let report = service.save_snapshot(SettingsPayload::new(vec![openai])).await.unwrap();
        assert!(report.removed.is_empty());

        let row = store.get_row(&id("local-vllm")).await.unwrap().unwrap();
        assert!(row.has_stored_credential());

        let report = service
            .save_snapshot(SettingsPayload::default().with_custom_providers(vec![id("local-vllm")]))
            .await
            .unwrap();
        assert!(report.removed.is_empty());
        assert!(store.get_row(&id("local-vllm")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_purposes_fall_back_to_defaults() {
        let store = Arc::new(InMemoryProviderSettingsStore::new());
        let service = service_with(store, StaticFallbackCredentials::new());
        let payload: SettingsPayload = serde_json::from_value(serde_json::json!({
            "providers": [
                { "id": "anthropic", "purposes": { "generation": false } },
                { "id": "openai", "purposes": { "validation": "yes" } },
                { "id": "mistral" }
            ]
        }))
        .unwrap();
        service.save_snapshot(payload).await.unwrap();

        let snapshot = service.load_snapshot(false).await.unwrap();
        let anthropic = snapshot.get(&id("anthropic")).unwrap().purposes;
        assert!(!anthropic.generation);
        assert!(anthropic.validation && anthropic.illustration && anthropic.migration);
        let openai = snapshot.get(&id("openai")).unwrap().purposes;
        assert!(openai.validation);
        assert!(!openai.migration);
        assert_eq!(
            snapshot.get(&id("mistral")).unwrap().purposes,
            PurposeEnablement::defaults_for(&id("mistral"), false, &id("anthropic"))
        );
    }

    #[tokio::test]
    async fn test_builtin_extra_headers_persisted() {
        let store = Arc::new(InMemoryProviderSettingsStore::new());
        let service = service_with(store, StaticFallbackCredentials::new());
        let mut openai = ProviderSettingsInput::new(
            id("openai"),
            PurposeEnablement::defaults_for(&id("openai"), false, &id("anthropic")),
        );
        openai.extra_headers = Some(BTreeMap::from([("OpenAI-Organization".to_string(), "org-quiz".to_string())]));
        openai.base_url = Some("http://ignored.example".into());
        service.save_snapshot(SettingsPayload::new(vec![openai])).await.unwrap();

        let snapshot = service.load_snapshot(false).await.unwrap();
        let descriptor = &snapshot.get(&id("openai")).unwrap().descriptor;
        assert_eq!(descriptor.extra_headers["OpenAI-Organization"], "org-quiz");
        assert_eq!(descriptor.base_url, BuiltinProvider::lookup(&id("openai")).unwrap().base_url);
    }

    #[tokio::test]
    async fn test_custom_without_base_url_rejected() {
        let service = service_with(Arc::new(InMemoryProviderSettingsStore::new()), StaticFallbackCredentials::new());
        let mut input = custom_input("broken");
        input.base_url = Some("  ".into());
        let err = service
            .save_snapshot(SettingsPayload::new(vec![input]))
            .await
            .unwrap_err();
        assert!(matches!(err, SettingsError::MissingBaseUrl { .. }));
    }

    #[tokio::test]
    async fn test_builtins_cannot_be_deleted() {
        let service = service_with(Arc::new(InMemoryProviderSettingsStore::new()), StaticFallbackCredentials::new());
        let err = service.delete_custom(&id("openai")).await.unwrap_err();
        assert!(matches!(err, SettingsError::BuiltinNotDeletable { .. }));
    }

    #[tokio::test]
    async fn test_is_enabled_follows_any_purpose() {
        let store = Arc::new(InMemoryProviderSettingsStore::new());
        let service = service_with(store.clone(), StaticFallbackCredentials::new());
        let off = PurposeEnablement {
            generation: false,
            validation: false,
            illustration: false,
            migration: false,
        };
        service
            .save_snapshot(SettingsPayload::new(vec![ProviderSettingsInput::new(id("together"), off)]))
            .await
            .unwrap();
        assert!(!store.get_row(&id("together")).await.unwrap().unwrap().is_enabled);
    }

    #[tokio::test]
    async fn test_public_view_never_contains_secret() {
        let store = Arc::new(InMemoryProviderSettingsStore::new());
        let service = service_with(store, StaticFallbackCredentials::new());
        let mut input = ProviderSettingsInput::new(
            id("fireworks"),
            PurposeEnablement::defaults_for(&id("fireworks"), false, &id("anthropic")),
        );
        input.api_key = Some("fw-very-secret-5555".into());
        service
            .save_snapshot(SettingsPayload::new(vec![input]))
            .await
            .unwrap();

        let rendered = serde_json::to_string(&service.public_settings().await.unwrap()).unwrap();
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("5555"));
    }
}
