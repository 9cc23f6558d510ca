// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Llm
//!
//! Provider capability contract and the error taxonomy used for
//! operational decisions.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Anti-corruption layer between quiz workflows and vendor APIs

// Implementations live in infrastructure/llm/. One backend per vendor family
// plus a generic backend for operator-declared OpenAI-compatible endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::provider::{ProviderCapabilities, ProviderId};
use super::purpose::Purpose;
use super::quiz::{
    AmbiguityResult, EditContext, EditProposal, GeneratedItem, GenerationRequest, Illustration,
    QuizItem, ValidationCriteria, ValidationResult,
};

/// Capability contract every provider adapter implements.
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn id(&self) -> &ProviderId;

    /// Resolved model identifier used for every call.
    fn model(&self) -> &str;

    /// Generate bilingual quiz items. Items failing acceptance are dropped.
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<GeneratedItem>, ProviderError>;

    /// Full validation: factual correctness, translation parity, single
    /// correct answer.
    async fn validate(
        &self,
        item: &QuizItem,
        criteria: &ValidationCriteria,
    ) -> Result<ValidationResult, ProviderError>;

    /// Narrow probe for whether more than one option could be correct.
    async fn check_ambiguity(&self, item: &QuizItem) -> Result<AmbiguityResult, ProviderError>;

    /// Minimal edits fixing `issues`.
    async fn propose_edits(
        &self,
        item: &QuizItem,
        issues: &[String],
        analysis: &EditContext,
    ) -> Result<EditProposal, ProviderError>;

    /// Single topic emoji that does not reveal the answer.
    async fn illustrate(&self, item: &QuizItem) -> Result<Illustration, ProviderError>;

    /// Minimal-cost probe. Never fails; problems are reported in the result.
    async fn check_liveness(&self) -> LivenessReport;

    fn describe(&self) -> ProviderDescription;
}

/// Adapter lookup for one orchestration cycle.
pub trait ProviderLookup: Send + Sync {
    /// Builds (or returns the cached) adapter. Fails fast without a
    /// credential.
    fn get_adapter(&self, id: &ProviderId) -> Result<Arc<dyn AiProvider>, ProviderError>;

    /// Ids eligible for `purpose`, or credentialed and enabled when `None`.
    fn list_available(&self, purpose: Option<Purpose>) -> Vec<ProviderId>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Generation,
    Validation,
    Ambiguity,
    EditProposal,
    Illustration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescription {
    pub id: ProviderId,
    pub label: String,
    pub model: String,
    pub capabilities: Vec<Capability>,
    pub structured_output: bool,
    pub supported_languages: Vec<String>,
    pub max_batch_size: u32,
}

impl ProviderDescription {
    pub fn from_capabilities(
        id: ProviderId,
        label: String,
        model: String,
        capabilities: &ProviderCapabilities,
    ) -> Self {
        Self {
            id,
            label,
            model,
            capabilities: vec![
                Capability::Generation,
                Capability::Validation,
                Capability::Ambiguity,
                Capability::EditProposal,
                Capability::Illustration,
            ],
            structured_output: capabilities.structured_output,
            supported_languages: super::quiz::SUPPORTED_LANGUAGES
                .iter()
                .map(|l| l.to_string())
                .collect(),
            max_batch_size: capabilities.max_batch_size,
        }
    }
}

/// Liveness failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LivenessError {
    InsufficientCredits,
    RateLimit,
    AuthError,
    ConnectionError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivenessReport {
    pub provider: ProviderId,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LivenessError>,
    pub message: String,
}

impl LivenessReport {
    pub fn available(provider: ProviderId) -> Self {
        Self {
            provider,
            available: true,
            error: None,
            message: "Provider is available".to_string(),
        }
    }

    /// Maps a probe failure onto the liveness classes. Unclassified HTTP
    /// failures and timeouts count as connection errors.
    pub fn from_error(provider: ProviderId, error: &ProviderError) -> Self {
        let class = match error.credential_class() {
            Some(CredentialErrorClass::InsufficientCredits) => LivenessError::InsufficientCredits,
            Some(CredentialErrorClass::RateLimit) => LivenessError::RateLimit,
            Some(CredentialErrorClass::Authentication) => LivenessError::AuthError,
            Some(CredentialErrorClass::Unknown) | None => LivenessError::ConnectionError,
        };
        Self {
            provider,
            available: false,
            error: Some(class),
            message: error.summary(),
        }
    }
}

/// Classification of an HTTP failure by status and body heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialErrorClass {
    InsufficientCredits,
    RateLimit,
    Authentication,
    Unknown,
}

impl CredentialErrorClass {
    pub fn status_code(&self) -> CallerStatus {
        match self {
            Self::InsufficientCredits => CallerStatus::NoCredits,
            Self::RateLimit => CallerStatus::RateLimited,
            Self::Authentication => CallerStatus::AuthError,
            Self::Unknown => CallerStatus::Error,
        }
    }
}

/// Machine-readable status code reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerStatus {
    Active,
    NoCredits,
    RateLimited,
    AuthError,
    NotConfigured,
    Error,
}

/// Stable kind of a [`ProviderError`], used in user-visible error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    MissingCredential,
    UnsupportedCapability,
    Timeout,
    HttpError,
    ConnectionError,
    ParseError,
    InsufficientCredits,
    RateLimit,
    AuthError,
    Configuration,
}

impl ProviderErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::UnsupportedCapability => "unsupported_capability",
            Self::Timeout => "timeout",
            Self::HttpError => "http_error",
            Self::ConnectionError => "connection_error",
            Self::ParseError => "parse_error",
            Self::InsufficientCredits => "insufficient_credits",
            Self::RateLimit => "rate_limit",
            Self::AuthError => "auth_error",
            Self::Configuration => "configuration",
        }
    }
}

/// Errors from adapter construction or a single adapter call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider '{provider}' has no credential")]
    MissingCredential { provider: ProviderId },

    /// Only produced internally; the resilience wrapper downgrades and
    /// retries before anything reaches a caller.
    #[error("Provider '{provider}' does not support {capability}")]
    UnsupportedCapability {
        provider: ProviderId,
        capability: String,
    },

    #[error("Provider '{provider}' timed out after {}ms", .after.as_millis())]
    Timeout { provider: ProviderId, after: Duration },

    #[error("Provider '{provider}' returned HTTP {status}: {body}")]
    Http {
        provider: ProviderId,
        status: u16,
        body: String,
        class: CredentialErrorClass,
    },

    #[error("Provider '{provider}' connection failed: {message}")]
    Connection { provider: ProviderId, message: String },

    #[error("Provider '{provider}' response could not be parsed: {message}")]
    Parse { provider: ProviderId, message: String },

    #[error("Provider '{provider}' is misconfigured: {message}")]
    Configuration { provider: ProviderId, message: String },
}

impl ProviderError {
    pub fn provider(&self) -> &ProviderId {
        match self {
            Self::MissingCredential { provider }
            | Self::UnsupportedCapability { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::Http { provider, .. }
            | Self::Connection { provider, .. }
            | Self::Parse { provider, .. }
            | Self::Configuration { provider, .. } => provider,
        }
    }

    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            Self::MissingCredential { .. } => ProviderErrorKind::MissingCredential,
            Self::UnsupportedCapability { .. } => ProviderErrorKind::UnsupportedCapability,
            Self::Timeout { .. } => ProviderErrorKind::Timeout,
            Self::Http { class, .. } => match class {
                CredentialErrorClass::InsufficientCredits => ProviderErrorKind::InsufficientCredits,
                CredentialErrorClass::RateLimit => ProviderErrorKind::RateLimit,
                CredentialErrorClass::Authentication => ProviderErrorKind::AuthError,
                CredentialErrorClass::Unknown => ProviderErrorKind::HttpError,
            },
            Self::Connection { .. } => ProviderErrorKind::ConnectionError,
            Self::Parse { .. } => ProviderErrorKind::ParseError,
            Self::Configuration { .. } => ProviderErrorKind::Configuration,
        }
    }

    pub fn credential_class(&self) -> Option<CredentialErrorClass> {
        match self {
            Self::Http { class, .. } => Some(*class),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Short caller-facing message without vendor body text.
    pub fn summary(&self) -> String {
        match self {
            Self::MissingCredential { .. } => "No API key configured".to_string(),
            Self::UnsupportedCapability { capability, .. } => {
                format!("Capability not supported: {}", capability)
            }
            Self::Timeout { after, .. } => format!("Timed out after {}ms", after.as_millis()),
            Self::Http { status, class, .. } => match class {
                CredentialErrorClass::InsufficientCredits => "Insufficient credits or quota".to_string(),
                CredentialErrorClass::RateLimit => "Rate limit exceeded".to_string(),
                CredentialErrorClass::Authentication => "Authentication failed".to_string(),
                CredentialErrorClass::Unknown => format!("API error: HTTP {}", status),
            },
            Self::Connection { .. } => "Connection to provider failed".to_string(),
            Self::Parse { .. } => "Provider returned an unreadable response".to_string(),
            Self::Configuration { message, .. } => message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ProviderId {
        ProviderId::parse("mistral").unwrap()
    }

    #[test]
    fn test_http_error_kind_follows_class() {
        let err = ProviderError::Http {
            provider: id(),
            status: 429,
            body: "rate_limit".into(),
            class: CredentialErrorClass::RateLimit,
        };
        assert_eq!(err.kind(), ProviderErrorKind::RateLimit);
        assert_eq!(err.summary(), "Rate limit exceeded");
        assert_eq!(
            CredentialErrorClass::RateLimit.status_code(),
            CallerStatus::RateLimited
        );
    }

    #[test]
    fn test_liveness_from_timeout_is_connection_error() {
        let err = ProviderError::Timeout {
            provider: id(),
            after: Duration::from_secs(5),
        };
        let report = LivenessReport::from_error(id(), &err);
        assert!(!report.available);
        assert_eq!(report.error, Some(LivenessError::ConnectionError));
    }

    #[test]
    fn test_summary_hides_vendor_body() {
        let err = ProviderError::Http {
            provider: id(),
            status: 500,
            body: "stack trace at line 42".into(),
            class: CredentialErrorClass::Unknown,
        };
        assert!(!err.summary().contains("stack trace"));
    }
}
