// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Wire DTOs for the downstream JSON surface.
//
// Errors always carry the provider (when one was involved), the purpose and
// a stable kind; vendor response bodies never reach a caller.

use serde::Serialize;

use crate::application::liveness::ProviderStatusReport;
use crate::application::orchestration::{GenerationOutcome, OrchestrationCycle, OrchestrationError};
use crate::application::router::PurposeError;
use crate::application::settings_service::SettingsError;
use crate::application::validation_fanout::{FanOutOutcome, ValidatorFailure};
use crate::domain::llm::ProviderErrorKind;
use crate::domain::provider::ProviderId;
use crate::domain::purpose::{EnablementMatrix, Purpose};
use crate::domain::quiz::{GeneratedItem, ValidationResult};
use crate::domain::settings::ProviderSettingsView;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSummary {
    pub id: ProviderId,
    pub label: String,
    pub model: String,
}

/// Providers usable for a purpose in the current cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableProvidersResponse {
    pub purpose: Purpose,
    pub providers: Vec<ProviderSummary>,
    pub enablement: EnablementMatrix,
}

impl AvailableProvidersResponse {
    pub fn from_cycle(cycle: &OrchestrationCycle, purpose: Purpose) -> Self {
        let snapshot = cycle.snapshot();
        let providers = cycle
            .available(purpose)
            .into_iter()
            .filter_map(|id| snapshot.get(&id))
            .map(|config| ProviderSummary {
                id: config.descriptor.id.clone(),
                label: config.descriptor.label.clone(),
                model: config.descriptor.model.clone(),
            })
            .collect();
        Self {
            purpose,
            providers,
            enablement: snapshot.enablement_matrix(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub provider: ProviderId,
    pub model: String,
    pub count: usize,
    pub questions: Vec<GeneratedItem>,
}

impl From<GenerationOutcome> for GenerationResponse {
    fn from(outcome: GenerationOutcome) -> Self {
        Self {
            provider: outcome.provider,
            model: outcome.model,
            count: outcome.items.len(),
            questions: outcome.items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub results: Vec<ValidationResult>,
    pub approvals: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<ValidatorFailure>,
}

impl From<FanOutOutcome> for ValidationResponse {
    fn from(outcome: FanOutOutcome) -> Self {
        Self {
            approvals: outcome.approvals(),
            failed: outcome.failed(),
            skipped: outcome.skipped.len(),
            results: outcome.results,
            failures: outcome.failures,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub providers: Vec<ProviderSettingsView>,
}

pub type StatusResponse = ProviderStatusReport;

/// User-visible error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<Purpose>,
    pub kind: String,
    pub message: String,
    #[serde(skip)]
    pub status: u16,
}

impl From<&OrchestrationError> for ErrorBody {
    fn from(error: &OrchestrationError) -> Self {
        match error {
            OrchestrationError::Settings(e) => Self::from(e),
            OrchestrationError::Purpose(e) => Self::from(e),
            OrchestrationError::Provider { purpose, source } => Self {
                provider: Some(source.provider().clone()),
                purpose: Some(*purpose),
                kind: source.kind().as_str().to_string(),
                message: source.summary(),
                status: provider_status_code(source.kind()),
            },
        }
    }
}

impl From<&PurposeError> for ErrorBody {
    fn from(error: &PurposeError) -> Self {
        let kind = match error {
            PurposeError::NotConfigured { .. } => "not_configured",
            PurposeError::NoneAvailable { .. } => "none_available",
        };
        Self {
            provider: None,
            purpose: Some(error.purpose()),
            kind: kind.to_string(),
            message: error.to_string(),
            status: 503,
        }
    }
}

impl From<&SettingsError> for ErrorBody {
    fn from(error: &SettingsError) -> Self {
        let (provider, kind, status) = match error {
            SettingsError::MissingBaseUrl { provider } => (Some(provider.clone()), "invalid_settings", 400),
            SettingsError::ReservedId { provider } => (Some(provider.clone()), "invalid_settings", 400),
            SettingsError::BuiltinNotDeletable { provider } => (Some(provider.clone()), "invalid_settings", 400),
            SettingsError::EncryptionUnavailable { provider } => (Some(provider.clone()), "encryption_unavailable", 500),
            SettingsError::Crypto(_) => (None, "encryption_error", 500),
            SettingsError::Repository(_) => (None, "storage_error", 500),
        };
        Self {
            provider,
            purpose: None,
            kind: kind.to_string(),
            message: error.to_string(),
            status,
        }
    }
}

/// HTTP status for a failed provider call.
pub fn provider_status_code(kind: ProviderErrorKind) -> u16 {
    match kind {
        ProviderErrorKind::Timeout => 504,
        ProviderErrorKind::MissingCredential | ProviderErrorKind::Configuration => 503,
        ProviderErrorKind::RateLimit => 429,
        ProviderErrorKind::InsufficientCredits
        | ProviderErrorKind::AuthError
        | ProviderErrorKind::HttpError
        | ProviderErrorKind::ConnectionError
        | ProviderErrorKind::ParseError
        | ProviderErrorKind::UnsupportedCapability => 502,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::{CredentialErrorClass, ProviderError};
    use std::time::Duration;

    fn id(value: &str) -> ProviderId {
        ProviderId::parse(value).unwrap()
    }

    #[test]
    fn test_provider_error_body_hides_vendor_text() {
        let error = OrchestrationError::Provider {
            purpose: Purpose::Generation,
            source: ProviderError::Http {
                provider: id("openai"),
                status: 429,
                body: r#"{"error":{"code":"insufficient_quota","trace":"internal"}}"#.into(),
                class: CredentialErrorClass::InsufficientCredits,
            },
        };
        let body = ErrorBody::from(&error);
        assert_eq!(body.provider, Some(id("openai")));
        assert_eq!(body.purpose, Some(Purpose::Generation));
        assert_eq!(body.kind, "insufficient_credits");
        assert_eq!(body.status, 502);

        let rendered = serde_json::to_string(&body).unwrap();
        assert!(!rendered.contains("trace"));
        assert!(!rendered.contains("status"));
    }

    #[test]
    fn test_routing_errors_are_distinct() {
        let not_configured = ErrorBody::from(&PurposeError::NotConfigured { purpose: Purpose::Validation });
        let none_available = ErrorBody::from(&PurposeError::NoneAvailable {
            purpose: Purpose::Validation,
            candidates: 2,
        });
        assert_eq!(not_configured.kind, "not_configured");
        assert_eq!(none_available.kind, "none_available");
        assert_ne!(not_configured.message, none_available.message);
    }

    #[test]
    fn test_timeout_maps_to_gateway_timeout() {
        let error = OrchestrationError::Provider {
            purpose: Purpose::Validation,
            source: ProviderError::Timeout {
                provider: id("gemini"),
                after: Duration::from_secs(60),
            },
        };
        let body = ErrorBody::from(&error);
        assert_eq!(body.status, 504);
        assert_eq!(body.kind, "timeout");
        assert_eq!(body.message, "Timed out after 60000ms");
    }

    #[test]
    fn test_validation_response_counts() {
        let outcome = FanOutOutcome {
            results: Vec::new(),
            failures: vec![ValidatorFailure {
                provider: id("groq"),
                kind: ProviderErrorKind::Timeout,
                message: "Timed out after 5000ms".into(),
            }],
            skipped: vec![id("my-llm")],
        };
        let response = ValidationResponse::from(outcome);
        assert_eq!((response.approvals, response.failed, response.skipped), (0, 1, 1));
    }
}
