// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Orchestration cycle
//!
//! One cycle serves one request: it loads a decrypted settings snapshot,
//! builds a fresh provider registry and routes each operation to providers
//! eligible for its purpose. Dropping the cycle drops every adapter and
//! credential it resolved.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::liveness::{ProviderStatusReport, ProviderStatusService};
use super::router::{PurposeError, PurposeRouter};
use super::settings_service::{ProviderSettingsService, SettingsError};
use super::validation_fanout::{FanOutOutcome, ValidationFanOut};
use crate::domain::config::OrchestratorConfigSpec;
use crate::domain::llm::{AiProvider, ProviderError, ProviderErrorKind, ProviderLookup};
use crate::domain::provider::ProviderId;
use crate::domain::purpose::Purpose;
use crate::domain::quiz::{
    AmbiguityResult, EditContext, EditProposal, GeneratedItem, GenerationRequest, Illustration,
    QuizItem, ValidationCriteria,
};
use crate::domain::settings::ProviderConfigSnapshot;
use crate::infrastructure::http::HttpTransport;
use crate::infrastructure::llm::call_log::CallLogSink;
use crate::infrastructure::llm::ProviderRegistry;

#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("Failed to load provider settings: {0}")]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Purpose(#[from] PurposeError),

    #[error("{purpose} via '{}' failed: {source}", .source.provider())]
    Provider {
        purpose: Purpose,
        #[source]
        source: ProviderError,
    },
}

impl OrchestrationError {
    fn provider_failure(purpose: Purpose) -> impl FnOnce(ProviderError) -> Self {
        move |source| Self::Provider { purpose, source }
    }

    pub fn purpose(&self) -> Option<Purpose> {
        match self {
            Self::Settings(_) => None,
            Self::Purpose(e) => Some(e.purpose()),
            Self::Provider { purpose, .. } => Some(*purpose),
        }
    }

    pub fn provider(&self) -> Option<&ProviderId> {
        match self {
            Self::Provider { source, .. } => Some(source.provider()),
            _ => None,
        }
    }

    pub fn provider_kind(&self) -> Option<ProviderErrorKind> {
        match self {
            Self::Provider { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

/// Items from one generator call, with the provider that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub provider: ProviderId,
    pub model: String,
    pub items: Vec<GeneratedItem>,
}

pub struct OrchestrationCycle {
    cycle_id: Uuid,
    snapshot: Arc<ProviderConfigSnapshot>,
    registry: Arc<ProviderRegistry>,
    router: PurposeRouter,
    fan_out: ValidationFanOut,
}

impl OrchestrationCycle {
    pub async fn begin(
        settings: &ProviderSettingsService,
        config: &OrchestratorConfigSpec,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, OrchestrationError> {
        let snapshot = Arc::new(settings.load_snapshot(true).await?);
        let registry = ProviderRegistry::from_config(snapshot.clone(), transport, config);
        Ok(Self::assemble(snapshot, registry, config))
    }

    /// Same as [`begin`](Self::begin) with every provider call reported to
    /// `call_log`.
    pub async fn begin_with_call_log(
        settings: &ProviderSettingsService,
        config: &OrchestratorConfigSpec,
        transport: Arc<dyn HttpTransport>,
        call_log: Arc<dyn CallLogSink>,
    ) -> Result<Self, OrchestrationError> {
        let snapshot = Arc::new(settings.load_snapshot(true).await?);
        let registry =
            ProviderRegistry::from_config(snapshot.clone(), transport, config).with_call_log(call_log);
        Ok(Self::assemble(snapshot, registry, config))
    }

    fn assemble(
        snapshot: Arc<ProviderConfigSnapshot>,
        registry: ProviderRegistry,
        config: &OrchestratorConfigSpec,
    ) -> Self {
        let registry = Arc::new(registry);
        let cycle_id = Uuid::new_v4();
        info!(
            cycle_id = %cycle_id,
            providers = snapshot.len(),
            credentialed = snapshot.iter().filter(|c| c.has_credential()).count(),
            "Orchestration cycle started"
        );
        Self {
            cycle_id,
            router: PurposeRouter::new(registry.clone(), config.trusted_migration_provider()),
            fan_out: ValidationFanOut::new(config.validation_deadline()),
            snapshot,
            registry,
        }
    }

    pub fn cycle_id(&self) -> Uuid {
        self.cycle_id
    }

    pub fn snapshot(&self) -> &ProviderConfigSnapshot {
        &self.snapshot
    }

    pub fn available(&self, purpose: Purpose) -> Vec<ProviderId> {
        self.router.available(purpose)
    }

    /// Providers that are credentialed and enabled, regardless of purpose.
    pub fn credentialed(&self) -> Vec<ProviderId> {
        self.registry.list_available(None)
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
        preferred: Option<&ProviderId>,
    ) -> Result<GenerationOutcome, OrchestrationError> {
        let generator = self.router.select_generator(preferred)?;
        info!(
            cycle_id = %self.cycle_id,
            provider = %generator.id(),
            model = generator.model(),
            quantity = request.quantity,
            "Generating quiz items"
        );
        let items = generator
            .generate(request)
            .await
            .map_err(OrchestrationError::provider_failure(Purpose::Generation))?;

        Ok(GenerationOutcome {
            provider: generator.id().clone(),
            model: generator.model().to_string(),
            items,
        })
    }

    /// Validates `item` with every eligible provider except `generator`.
    pub async fn validate(
        &self,
        item: &QuizItem,
        criteria: &ValidationCriteria,
        generator: Option<&ProviderId>,
    ) -> Result<FanOutOutcome, OrchestrationError> {
        let set = self.router.select_validators(generator)?;
        let mut outcome = self.fan_out.run(set.validators, item, criteria).await;
        outcome.skipped = set.skipped;

        if outcome.results.is_empty() {
            warn!(
                cycle_id = %self.cycle_id,
                failed = outcome.failed(),
                skipped = outcome.skipped.len(),
                "No validator produced a result"
            );
        }
        Ok(outcome)
    }

    /// First successful ambiguity verdict among the validation providers,
    /// excluding `generator`.
    pub async fn check_ambiguity(
        &self,
        item: &QuizItem,
        generator: Option<&ProviderId>,
    ) -> Result<AmbiguityResult, OrchestrationError> {
        let set = self.router.select_validators(generator)?;
        let mut last_error = None;
        for validator in set.validators {
            match validator.check_ambiguity(item).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    warn!(cycle_id = %self.cycle_id, provider = %validator.id(), error = %e, "Ambiguity check failed, trying next provider");
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) => Err(OrchestrationError::provider_failure(Purpose::Validation)(e)),
            None => Err(PurposeError::NoneAvailable {
                purpose: Purpose::Validation,
                candidates: 0,
            }
            .into()),
        }
    }

    /// Edit proposal from the single migration provider.
    pub async fn propose_edits(
        &self,
        item: &QuizItem,
        issues: &[String],
        analysis: &EditContext,
    ) -> Result<EditProposal, OrchestrationError> {
        let migrator = self.router.select_migrator()?;
        info!(cycle_id = %self.cycle_id, provider = %migrator.id(), issues = issues.len(), "Requesting edit proposal");
        migrator
            .propose_edits(item, issues, analysis)
            .await
            .map_err(OrchestrationError::provider_failure(Purpose::Migration))
    }

    pub async fn illustrate(&self, item: &QuizItem) -> Result<Illustration, OrchestrationError> {
        let illustrator = self.router.select_illustrator()?;
        illustrator
            .illustrate(item)
            .await
            .map_err(OrchestrationError::provider_failure(Purpose::Illustration))
    }

    /// Liveness of every configured provider.
    pub async fn status(&self) -> ProviderStatusReport {
        let lookup: Arc<dyn ProviderLookup> = self.registry.clone();
        ProviderStatusService::new(self.snapshot.clone(), lookup)
            .check_all()
            .await
    }

    /// Adapter used for `id` in this cycle.
    pub fn provider(&self, id: &ProviderId) -> Result<Arc<dyn AiProvider>, ProviderError> {
        self.registry.get_adapter(id)
    }
}

impl Drop for OrchestrationCycle {
    fn drop(&mut self) {
        tracing::debug!(cycle_id = %self.cycle_id, "Orchestration cycle finished");
    }
}
