// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Validation Fan-Out
//
// Dispatches one validation call per validator concurrently. Every call is
// cancelled independently by its own deadline and a failing validator never
// blocks the others, so total latency tracks the slowest surviving call.
// Calls run inside the caller's task: dropping `run` cancels all of them.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::domain::llm::{AiProvider, ProviderError, ProviderErrorKind};
use crate::domain::provider::ProviderId;
use crate::domain::quiz::{QuizItem, ValidationCriteria, ValidationResult};

/// One validator that produced no result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorFailure {
    pub provider: ProviderId,
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ValidatorFailure {
    fn from_error(error: &ProviderError) -> Self {
        Self {
            provider: error.provider().clone(),
            kind: error.kind(),
            message: error.summary(),
        }
    }
}

/// Successful subset of a fan-out plus what was lost on the way.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FanOutOutcome {
    pub results: Vec<ValidationResult>,
    pub failures: Vec<ValidatorFailure>,
    /// Eligible validators that could not be constructed.
    pub skipped: Vec<ProviderId>,
}

impl FanOutOutcome {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.len()
    }

    pub fn approvals(&self) -> usize {
        self.results.iter().filter(|r| r.is_valid).count()
    }
}

pub struct ValidationFanOut {
    deadline: Option<Duration>,
}

impl ValidationFanOut {
    /// `deadline` bounds each validator on top of the adapter's own call
    /// timeout.
    pub fn new(deadline: Option<Duration>) -> Self {
        Self { deadline }
    }

    pub async fn run(
        &self,
        validators: Vec<Arc<dyn AiProvider>>,
        item: &QuizItem,
        criteria: &ValidationCriteria,
    ) -> FanOutOutcome {
        let started = Instant::now();
        let dispatched = validators.len();

        let deadline = self.deadline;
        let calls = validators.iter().map(|validator| async move {
            let call = validator.validate(item, criteria);
            match deadline {
                Some(after) => match tokio::time::timeout(after, call).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout {
                        provider: validator.id().clone(),
                        after,
                    }),
                },
                None => call.await,
            }
        });

        let mut outcome = FanOutOutcome::default();
        for result in join_all(calls).await {
            match result {
                Ok(result) => outcome.results.push(result),
                Err(e) => {
                    warn!(provider = %e.provider(), kind = ?e.kind(), error = %e, "Validator failed");
                    outcome.failures.push(ValidatorFailure::from_error(&e));
                }
            }
        }

        info!(
            dispatched,
            succeeded = outcome.succeeded(),
            failed = outcome.failed(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Validation fan-out complete"
        );
        outcome
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::llm::{LivenessReport, ProviderDescription};
    use crate::domain::provider::ProviderCapabilities;
    use crate::domain::quiz::{
        AmbiguityResult, EditContext, EditProposal, GeneratedItem, GenerationRequest, Illustration,
    };
    use async_trait::async_trait;

    /// Validator that answers after `delay`, or fails when `fail` is set.
    pub(crate) struct DelayedValidator {
        pub id: ProviderId,
        pub delay: Duration,
        pub fail: bool,
    }

    impl DelayedValidator {
        pub(crate) fn new(id: &str, delay_ms: u64) -> Arc<dyn AiProvider> {
            Arc::new(Self {
                id: ProviderId::parse(id).unwrap(),
                delay: Duration::from_millis(delay_ms),
                fail: false,
            })
        }

        pub(crate) fn failing(id: &str) -> Arc<dyn AiProvider> {
            Arc::new(Self {
                id: ProviderId::parse(id).unwrap(),
                delay: Duration::ZERO,
                fail: true,
            })
        }

        fn unsupported(&self) -> ProviderError {
            ProviderError::Configuration {
                provider: self.id.clone(),
                message: "validation only".into(),
            }
        }
    }

    #[async_trait]
    impl AiProvider for DelayedValidator {
        fn id(&self) -> &ProviderId {
            &self.id
        }
        fn model(&self) -> &str {
            "slow-model"
        }
        async fn generate(&self, _: &GenerationRequest) -> Result<Vec<GeneratedItem>, ProviderError> {
            Err(self.unsupported())
        }
        async fn validate(&self, _: &QuizItem, _: &ValidationCriteria) -> Result<ValidationResult, ProviderError> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(ProviderError::Http {
                    provider: self.id.clone(),
                    status: 401,
                    body: "invalid api key".into(),
                    class: crate::domain::llm::CredentialErrorClass::Authentication,
                });
            }
            Ok(ValidationResult {
                provider: self.id.clone(),
                model: "slow-model".into(),
                is_valid: true,
                confidence: 90,
                issues: Vec::new(),
                suggestions: Vec::new(),
                feedback: "ok".into(),
                multiple_correct_options: false,
                alternative_correct_options: Vec::new(),
                time_sensitive: false,
                best_before_date: None,
                proposed_edits: None,
            })
        }
        async fn check_ambiguity(&self, _: &QuizItem) -> Result<AmbiguityResult, ProviderError> {
            Err(self.unsupported())
        }
        async fn propose_edits(&self, _: &QuizItem, _: &[String], _: &EditContext) -> Result<EditProposal, ProviderError> {
            Err(self.unsupported())
        }
        async fn illustrate(&self, _: &QuizItem) -> Result<Illustration, ProviderError> {
            Err(self.unsupported())
        }
        async fn check_liveness(&self) -> LivenessReport {
            LivenessReport::available(self.id.clone())
        }
        fn describe(&self) -> ProviderDescription {
            ProviderDescription::from_capabilities(
                self.id.clone(),
                self.id.to_string(),
                "slow-model".into(),
                &ProviderCapabilities::default(),
            )
        }
    }

    pub(crate) fn item() -> QuizItem {
        QuizItem {
            question_sv: "Vilken är Sveriges huvudstad?".into(),
            question_en: "What is the capital of Sweden?".into(),
            options_sv: vec!["Oslo".into(), "Stockholm".into(), "Göteborg".into(), "Malmö".into()],
            options_en: vec!["Oslo".into(), "Stockholm".into(), "Gothenburg".into(), "Malmo".into()],
            correct_option: 1,
            explanation_sv: String::new(),
            explanation_en: String::new(),
            background_sv: "Geografi".into(),
            background_en: "Geography".into(),
            emoji: None,
            target_audience: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_results_track_slowest_survivor() {
        let fan_out = ValidationFanOut::new(Some(Duration::from_secs(5)));
        let validators = vec![
            DelayedValidator::new("openai", 1_000),
            DelayedValidator::new("gemini", 2_000),
            DelayedValidator::new("mistral", 60_000),
        ];

        let started = tokio::time::Instant::now();
        let outcome = fan_out.run(validators, &item(), &ValidationCriteria::default()).await;
        let elapsed = started.elapsed();

        assert_eq!(outcome.succeeded(), 2);
        assert_eq!(outcome.failed(), 1);
        assert_eq!(outcome.failures[0].kind, ProviderErrorKind::Timeout);
        assert_eq!(outcome.failures[0].provider.as_str(), "mistral");
        // Bounded by the deadline, not the 63s sum.
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_not_sequential() {
        let fan_out = ValidationFanOut::new(None);
        let validators = vec![
            DelayedValidator::new("openai", 3_000),
            DelayedValidator::new("gemini", 3_000),
            DelayedValidator::new("anthropic", 3_000),
        ];

        let started = tokio::time::Instant::now();
        let outcome = fan_out.run(validators, &item(), &ValidationCriteria::default()).await;

        assert_eq!(outcome.succeeded(), 3);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_failure_is_isolated_and_classified() {
        let fan_out = ValidationFanOut::new(None);
        let validators = vec![DelayedValidator::failing("groq"), DelayedValidator::new("openai", 0)];

        let outcome = fan_out.run(validators, &item(), &ValidationCriteria::default()).await;
        assert_eq!(outcome.succeeded(), 1);
        assert_eq!(outcome.approvals(), 1);
        assert_eq!(outcome.failures[0].kind, ProviderErrorKind::AuthError);
        assert_eq!(outcome.failures[0].message, "Authentication failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_run_cancels_validators() {
        let fan_out = ValidationFanOut::new(None);
        let validators = vec![DelayedValidator::new("openai", 10_000)];
        let held = Arc::downgrade(&validators[0]);

        let abandoned = tokio::time::timeout(
            Duration::from_secs(1),
            fan_out.run(validators, &item(), &ValidationCriteria::default()),
        )
        .await;
        assert!(abandoned.is_err());
        // Nothing keeps the validator alive once the fan-out is dropped.
        assert!(held.upgrade().is_none());
    }

    #[tokio::test]
    async fn test_empty_fan_out() {
        let outcome = ValidationFanOut::new(None)
            .run(Vec::new(), &item(), &ValidationCriteria::default())
            .await;
        assert_eq!(outcome, FanOutOutcome::default());
    }
}
