// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// LLM Provider Registry - Adapter Construction and Eligibility
//
// Builds one adapter per provider id from a config snapshot and caches it
// for the lifetime of the registry. A registry belongs to exactly one
// orchestration cycle; credentials never outlive it.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::adapter::ProviderAdapter;
use super::anthropic::AnthropicBackend;
use super::call_log::{CallLogSink, TracingCallLog};
use super::gemini::GeminiBackend;
use super::openai::OpenAiBackend;
use super::openai_compatible::OpenAiCompatibleBackend;
use super::resilience::ResilientCaller;
use super::CompletionBackend;
use crate::domain::config::OrchestratorConfigSpec;
use crate::domain::credential::ApiSecret;
use crate::domain::llm::{AiProvider, ProviderError, ProviderLookup};
use crate::domain::provider::{BuiltinProvider, ProviderDescriptor, ProviderFamily, ProviderId};
use crate::domain::purpose::Purpose;
use crate::domain::settings::ProviderConfigSnapshot;
use crate::infrastructure::http::HttpTransport;

/// Family -> backend registration table.
pub fn backend_for(
    descriptor: &ProviderDescriptor,
    api_key: ApiSecret,
) -> Result<Arc<dyn CompletionBackend>, ProviderError> {
    let backend: Arc<dyn CompletionBackend> = match descriptor.family {
        ProviderFamily::OpenAi | ProviderFamily::OpenAiChat => {
            Arc::new(OpenAiBackend::new(descriptor, api_key))
        }
        ProviderFamily::Anthropic => Arc::new(AnthropicBackend::new(descriptor, api_key)),
        ProviderFamily::Gemini => Arc::new(GeminiBackend::new(descriptor, api_key)),
        ProviderFamily::OpenAiCompat => Arc::new(OpenAiCompatibleBackend::new(descriptor, api_key)?),
    };
    Ok(backend)
}

/// Registry for one orchestration cycle
pub struct ProviderRegistry {
    snapshot: Arc<ProviderConfigSnapshot>,
    transport: Arc<dyn HttpTransport>,
    call_log: Arc<dyn CallLogSink>,
    call_timeout: Option<Duration>,
    liveness_timeout: Option<Duration>,
    adapters: Mutex<HashMap<ProviderId, Arc<ProviderAdapter>>>,
}

impl ProviderRegistry {
    pub fn new(snapshot: Arc<ProviderConfigSnapshot>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            snapshot,
            transport,
            call_log: Arc::new(TracingCallLog),
            call_timeout: None,
            liveness_timeout: None,
            adapters: Mutex::new(HashMap::new()),
        }
    }

    /// Registry with deadlines taken from the orchestrator config.
    pub fn from_config(
        snapshot: Arc<ProviderConfigSnapshot>,
        transport: Arc<dyn HttpTransport>,
        config: &OrchestratorConfigSpec,
    ) -> Self {
        Self::new(snapshot, transport).with_timeouts(Some(config.call_timeout()), Some(config.liveness_timeout()))
    }

    pub fn with_timeouts(mut self, call_timeout: Option<Duration>, liveness_timeout: Option<Duration>) -> Self {
        self.call_timeout = call_timeout;
        self.liveness_timeout = liveness_timeout;
        self
    }

    pub fn with_call_log(mut self, call_log: Arc<dyn CallLogSink>) -> Self {
        self.call_log = call_log;
        self
    }

    pub fn snapshot(&self) -> &ProviderConfigSnapshot {
        &self.snapshot
    }

    /// Returns the cached adapter for `id`, building it on first use.
    pub fn adapter(&self, id: &ProviderId) -> Result<Arc<ProviderAdapter>, ProviderError> {
        if let Some(adapter) = self.adapters.lock().get(id) {
            return Ok(adapter.clone());
        }

        let adapter = Arc::new(self.build(id)?);
        // First insert wins on a racing build.
        let mut adapters = self.adapters.lock();
        let cached = adapters.entry(id.clone()).or_insert(adapter).clone();
        Ok(cached)
    }

    fn build(&self, id: &ProviderId) -> Result<ProviderAdapter, ProviderError> {
        let config = self.snapshot.get(id).ok_or_else(|| ProviderError::Configuration {
            provider: id.clone(),
            message: "Unknown provider".to_string(),
        })?;
        let api_key = config
            .credential
            .clone()
            .ok_or_else(|| ProviderError::MissingCredential { provider: id.clone() })?;

        let descriptor = config.descriptor.clone();
        let backend = backend_for(&descriptor, api_key)?;
        let caller = ResilientCaller::new(
            descriptor.id.clone(),
            descriptor.model.clone(),
            backend,
            self.transport.clone(),
            self.call_timeout,
            self.call_log.clone(),
        );

        info!(
            provider = %descriptor.id,
            family = descriptor.family.as_str(),
            model = %descriptor.model,
            key_source = ?config.key_source,
            "Initialized provider adapter"
        );
        Ok(ProviderAdapter::new(descriptor, caller, self.liveness_timeout))
    }

    /// Ids considered for eligibility: every configured provider, or the
    /// built-in catalog when the snapshot is empty.
    fn candidate_ids(&self) -> Vec<ProviderId> {
        if self.snapshot.is_empty() {
            BuiltinProvider::all_ids()
        } else {
            self.snapshot.ids()
        }
    }
}

impl ProviderLookup for ProviderRegistry {
    fn get_adapter(&self, id: &ProviderId) -> Result<Arc<dyn AiProvider>, ProviderError> {
        let adapter: Arc<dyn AiProvider> = self.adapter(id)?;
        Ok(adapter)
    }

    fn list_available(&self, purpose: Option<Purpose>) -> Vec<ProviderId> {
        let available: Vec<ProviderId> = self
            .candidate_ids()
            .into_iter()
            .filter(|id| {
                self.snapshot
                    .get(id)
                    .is_some_and(|config| config.is_eligible(purpose))
            })
            .collect();

        if available.is_empty() {
            warn!(purpose = ?purpose.map(|p| p.as_str()), "No providers available");
        } else {
            debug!(purpose = ?purpose.map(|p| p.as_str()), providers = ?available, "Available providers");
        }
        available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::credential::CredentialSource;
    use crate::domain::provider::ProviderCapabilities;
    use crate::domain::purpose::PurposeEnablement;
    use crate::domain::settings::ResolvedProviderConfig;
    use crate::infrastructure::http::ScriptedTransport;
    use std::collections::BTreeMap;

    fn resolved(id: &str, credential: Option<&str>, purposes: PurposeEnablement) -> ResolvedProviderConfig {
        let provider = ProviderId::parse(id).unwrap();
        let (family, model, base_url, is_custom) = match BuiltinProvider::lookup(&provider) {
            Some(b) => (b.family, b.default_model.to_string(), b.base_url.to_string(), false),
            None => (ProviderFamily::OpenAiCompat, "local".to_string(), String::new(), true),
        };
        ResolvedProviderConfig {
            descriptor: ProviderDescriptor {
                id: provider,
                label: id.to_string(),
                family,
                model,
                base_url,
                extra_headers: BTreeMap::new(),
                capabilities: ProviderCapabilities::default(),
                is_custom,
            },
            credential: credential.and_then(ApiSecret::new),
            key_source: credential.map(|_| CredentialSource::Db),
            key_hint: None,
            is_enabled: true,
            is_available: true,
            purposes,
        }
    }

    fn all_on() -> PurposeEnablement {
        PurposeEnablement {
            generation: true,
            validation: true,
            illustration: true,
            migration: false,
        }
    }

    fn registry(configs: Vec<ResolvedProviderConfig>) -> ProviderRegistry {
        ProviderRegistry::new(
            Arc::new(ProviderConfigSnapshot::new(configs)),
            Arc::new(ScriptedTransport::new()),
        )
    }

    #[test]
    fn test_missing_credential_fails_fast() {
        let registry = registry(vec![resolved("openai", None, all_on())]);
        let err = registry.get_adapter(&ProviderId::parse("openai").unwrap()).err().unwrap();
        assert!(matches!(err, ProviderError::MissingCredential { .. }));
    }

    #[test]
    fn test_adapters_are_cached_per_registry() {
        let registry = registry(vec![resolved("mistral", Some("mk-1"), all_on())]);
        let id = ProviderId::parse("mistral").unwrap();
        let first = registry.adapter(&id).unwrap();
        let second = registry.adapter(&id).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.descriptor().family, ProviderFamily::OpenAiChat);
    }

    #[test]
    fn test_custom_without_base_url_fails_construction() {
        let registry = registry(vec![resolved("my-llm", Some("k"), all_on())]);
        let err = registry.get_adapter(&ProviderId::parse("my-llm").unwrap()).err().unwrap();
        assert!(matches!(err, ProviderError::Configuration { .. }));
    }

    #[test]
    fn test_list_available_filters_by_purpose() {
        let mut generation_only = all_on();
        generation_only.validation = false;
        let registry = registry(vec![
            resolved("openai", Some("sk-1"), generation_only),
            resolved("gemini", None, all_on()),
        ]);

        let openai = ProviderId::parse("openai").unwrap();
        assert_eq!(registry.list_available(Some(Purpose::Generation)), vec![openai.clone()]);
        assert!(registry.list_available(Some(Purpose::Validation)).is_empty());
        assert_eq!(registry.list_available(None), vec![openai]);
    }

    #[test]
    fn test_empty_snapshot_has_nothing_available() {
        let registry = registry(Vec::new());
        assert!(registry.list_available(Some(Purpose::Generation)).is_empty());
    }
}
