// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Provider status aggregation
//!
//! Probes every configured provider concurrently and reports one status per
//! provider. Never fails: each problem is folded into that provider's entry.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::domain::credential::CredentialSource;
use crate::domain::llm::{CallerStatus, LivenessError, LivenessReport, ProviderLookup};
use crate::domain::provider::ProviderId;
use crate::domain::settings::{ProviderConfigSnapshot, ResolvedProviderConfig};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub id: ProviderId,
    pub label: String,
    pub model: String,
    pub status: CallerStatus,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LivenessError>,
    pub message: String,
    pub key_source: Option<CredentialSource>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderStatusReport {
    pub providers: Vec<ProviderStatus>,
    pub summary: StatusSummary,
}

pub fn status_for(error: Option<LivenessError>) -> CallerStatus {
    match error {
        None => CallerStatus::Active,
        Some(LivenessError::InsufficientCredits) => CallerStatus::NoCredits,
        Some(LivenessError::RateLimit) => CallerStatus::RateLimited,
        Some(LivenessError::AuthError) => CallerStatus::AuthError,
        Some(LivenessError::ConnectionError) => CallerStatus::Error,
    }
}

pub struct ProviderStatusService {
    snapshot: Arc<ProviderConfigSnapshot>,
    lookup: Arc<dyn ProviderLookup>,
}

impl ProviderStatusService {
    pub fn new(snapshot: Arc<ProviderConfigSnapshot>, lookup: Arc<dyn ProviderLookup>) -> Self {
        Self { snapshot, lookup }
    }

    pub async fn check_all(&self) -> ProviderStatusReport {
        let probes = self.snapshot.iter().map(|config| self.check_one(config));
        let providers = join_all(probes).await;

        let active = providers.iter().filter(|p| p.available).count();
        let summary = StatusSummary {
            total: providers.len(),
            active,
            inactive: providers.len() - active,
        };
        info!(total = summary.total, active = summary.active, "Provider status check complete");
        ProviderStatusReport { providers, summary }
    }

    async fn check_one(&self, config: &ResolvedProviderConfig) -> ProviderStatus {
        let descriptor = &config.descriptor;
        let mut status = ProviderStatus {
            id: descriptor.id.clone(),
            label: descriptor.label.clone(),
            model: descriptor.model.clone(),
            status: CallerStatus::NotConfigured,
            available: false,
            error: None,
            message: "No API key configured".to_string(),
            key_source: config.key_source,
        };
        if !config.has_credential() {
            return status;
        }

        let report = match self.lookup.get_adapter(&descriptor.id) {
            Ok(adapter) => adapter.check_liveness().await,
            Err(e) => {
                status.status = CallerStatus::Error;
                status.message = e.summary();
                return status;
            }
        };
        apply_report(&mut status, report);
        status
    }
}

fn apply_report(status: &mut ProviderStatus, report: LivenessReport) {
    status.status = status_for(report.error);
    status.available = report.available;
    status.error = report.error;
    status.message = report.message;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::credential::ApiSecret;
    use crate::domain::provider::{BuiltinProvider, ProviderCapabilities, ProviderDescriptor};
    use crate::domain::purpose::PurposeEnablement;
    use crate::infrastructure::http::{ScriptedResponse, ScriptedTransport};
    use crate::infrastructure::llm::ProviderRegistry;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn builtin(id: &str, credential: Option<&str>) -> ResolvedProviderConfig {
        let builtin = BuiltinProvider::lookup(&ProviderId::parse(id).unwrap()).unwrap();
        ResolvedProviderConfig {
            descriptor: ProviderDescriptor {
                id: builtin.provider_id(),
                label: builtin.label.into(),
                family: builtin.family,
                model: builtin.default_model.into(),
                base_url: builtin.base_url.into(),
                extra_headers: BTreeMap::new(),
                capabilities: ProviderCapabilities::default(),
                is_custom: false,
            },
            credential: credential.and_then(ApiSecret::new),
            key_source: credential.map(|_| CredentialSource::Env),
            key_hint: None,
            is_enabled: true,
            is_available: true,
            purposes: PurposeEnablement::defaults_for(&builtin.provider_id(), false, &builtin.provider_id()),
        }
    }

    #[tokio::test]
    async fn test_check_all_mixes_outcomes_without_short_circuit() {
        let snapshot = Arc::new(ProviderConfigSnapshot::new([
            builtin("openai", Some("sk-1")),
            builtin("anthropic", Some("ak-1")),
            builtin("gemini", None),
        ]));
        let transport = Arc::new(
            ScriptedTransport::new()
                .route(
                    "api.openai.com",
                    ScriptedResponse::ok(json!({"choices": [{"message": {"content": "Hi"}}]}).to_string()),
                )
                .route(
                    "api.anthropic.com",
                    ScriptedResponse::status(400, r#"{"error":{"message":"Your credit balance is too low"}}"#),
                ),
        );
        let registry = Arc::new(ProviderRegistry::new(snapshot.clone(), transport.clone()));
        let report = ProviderStatusService::new(snapshot, registry).check_all().await;

        assert_eq!(report.summary, StatusSummary { total: 3, active: 1, inactive: 2 });
        let by_id: BTreeMap<&str, &ProviderStatus> =
            report.providers.iter().map(|p| (p.id.as_str(), p)).collect();
        assert_eq!(by_id["openai"].status, CallerStatus::Active);
        assert_eq!(by_id["anthropic"].status, CallerStatus::NoCredits);
        assert_eq!(by_id["anthropic"].error, Some(LivenessError::InsufficientCredits));
        assert_eq!(by_id["gemini"].status, CallerStatus::NotConfigured);
        assert_eq!(transport.requests_to("generativelanguage"), 0);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(None), CallerStatus::Active);
        assert_eq!(status_for(Some(LivenessError::RateLimit)), CallerStatus::RateLimited);
        assert_eq!(status_for(Some(LivenessError::ConnectionError)), CallerStatus::Error);
    }
}
